// ── State reconciliation ──
//
// Pure merge + classify + derive-actions pipeline over the declared
// (config) and observed (system) collections. No suspension points, no
// clocks, no counters: the output is a function of the two inputs
// only, so reruns on unchanged inputs are bit-identical.

mod actions;
mod merge;
mod status;

pub use actions::{actions_for, Action, Effect};
pub use status::Status;

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::Source;
use status::RecordView;

const CONNECTED_FIELD: &str = "connected";
const LOCKED_FIELD: &str = "locked";

/// How records are identified and which source wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    /// Ordered fields whose concatenation is a record's identity.
    pub primary_key: Vec<String>,
    /// Sources from highest to lowest precedence.
    pub precedence: Vec<Source>,
}

impl MergeSpec {
    pub fn new<K, F>(primary_key: K, precedence: Vec<Source>) -> Self
    where
        K: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            precedence,
        }
    }
}

/// One reconciled record: merged fields plus derived status and
/// actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub identity: String,
    /// Which collections contributed.
    pub sources: BTreeSet<Source>,
    pub status: Status,
    pub actions: Vec<Action>,
    pub fields: serde_json::Map<String, Value>,
}

impl MergedRecord {
    pub fn is_locked(&self) -> bool {
        bool_field(&self.fields, LOCKED_FIELD)
    }
}

/// Merges, classifies and derives actions for the declared and
/// observed collections.
#[derive(Debug, Clone)]
pub struct Reconciler {
    spec: MergeSpec,
}

impl Reconciler {
    pub fn new(spec: MergeSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &MergeSpec {
        &self.spec
    }

    /// Run one reconciliation pass.
    ///
    /// A record missing a primary-key field fails the whole run; a
    /// record no rule classifies does not (it gets [`Status::Unknown`]
    /// and no actions, and the rest of the output stays usable).
    pub fn run(
        &self,
        config: &[serde_json::Map<String, Value>],
        system: &[serde_json::Map<String, Value>],
    ) -> Result<Vec<MergedRecord>, CoreError> {
        let merged = merge::merge(&self.spec, config, system)?;

        Ok(merged
            .into_iter()
            .map(|(identity, partial)| {
                let view = RecordView {
                    in_config: partial.sources.contains(&Source::Config),
                    in_system: partial.sources.contains(&Source::System),
                    connected: bool_field(&partial.fields, CONNECTED_FIELD),
                    locked: bool_field(&partial.fields, LOCKED_FIELD),
                };
                let status = status::classify(view);
                if status == Status::Unknown {
                    tracing::warn!(identity = %identity, "record matched no classification rule");
                }
                let actions = actions_for(status, view.locked);
                MergedRecord {
                    identity,
                    sources: partial.sources,
                    status,
                    actions,
                    fields: partial.fields,
                }
            })
            .collect())
    }
}

fn bool_field(fields: &serde_json::Map<String, Value>, name: &str) -> bool {
    fields.get(name).and_then(Value::as_bool).unwrap_or(false)
}
