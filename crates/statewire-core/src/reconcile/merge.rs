// ── Merge step ──
//
// Builds one record per identity out of the declared and observed
// collections. Field-by-field, the highest-precedence source that
// defines a field wins; lower-precedence sources only fill gaps.
// Output order is identity first-encounter order while scanning
// sources in precedence order, which makes reruns on unchanged inputs
// bit-identical.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::MergeSpec;
use crate::error::CoreError;
use crate::model::Source;

pub(crate) struct Partial {
    pub fields: serde_json::Map<String, Value>,
    pub sources: BTreeSet<Source>,
}

pub(crate) fn merge(
    spec: &MergeSpec,
    config: &[serde_json::Map<String, Value>],
    system: &[serde_json::Map<String, Value>],
) -> Result<IndexMap<String, Partial>, CoreError> {
    if spec.primary_key.is_empty() {
        return Err(CoreError::Config {
            message: "merge spec has an empty primary key".into(),
        });
    }

    let mut merged: IndexMap<String, Partial> = IndexMap::new();

    for &source in &spec.precedence {
        let records = match source {
            Source::Config => config,
            Source::System => system,
        };
        for record in records {
            let identity = identity_of(spec, source, record)?;
            match merged.entry(identity) {
                indexmap::map::Entry::Occupied(mut entry) => {
                    let partial = entry.get_mut();
                    for (name, value) in record {
                        partial
                            .fields
                            .entry(name.clone())
                            .or_insert_with(|| value.clone());
                    }
                    partial.sources.insert(source);
                }
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(Partial {
                        fields: record.clone(),
                        sources: BTreeSet::from([source]),
                    });
                }
            }
        }
    }

    Ok(merged)
}

fn identity_of(
    spec: &MergeSpec,
    source: Source,
    record: &serde_json::Map<String, Value>,
) -> Result<String, CoreError> {
    let mut parts = Vec::with_capacity(spec.primary_key.len());
    for field in &spec.primary_key {
        let value = record
            .get(field)
            .ok_or_else(|| CoreError::MissingKeyField {
                collection: source,
                field: field.clone(),
            })?;
        parts.push(key_part(value));
    }
    Ok(parts.join("|"))
}

// Strings are used verbatim so "3260" (string) and 3260 (number)
// compare equal across sources; everything else keeps its JSON form.
fn key_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
