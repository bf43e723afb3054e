// ── Reactive source store ──
//
// Holds the latest declared and observed target collections and
// re-reconciles synchronously on every update, publishing the result
// through a `watch` channel. Push-based: consumers await changes, they
// never poll.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{Source, Target};
use crate::reconcile::{MergeSpec, MergedRecord, Reconciler};

/// Identity fields for target reconciliation.
pub const TARGET_PRIMARY_KEY: [&str; 3] = ["name", "address", "port"];

/// Observed state outranks declared state.
pub const SOURCE_PRECEDENCE: [Source; 2] = [Source::System, Source::Config];

#[derive(Default)]
struct Inputs {
    config: Vec<serde_json::Map<String, Value>>,
    system: Vec<serde_json::Map<String, Value>>,
}

/// Latest declared/observed collections plus the published
/// reconciliation of the two.
pub struct SourceStore {
    reconciler: Reconciler,
    inputs: Mutex<Inputs>,
    published: watch::Sender<Arc<Vec<MergedRecord>>>,
}

impl SourceStore {
    /// Store with the standard target identity and precedence.
    pub fn new() -> Self {
        Self::with_spec(MergeSpec::new(TARGET_PRIMARY_KEY, SOURCE_PRECEDENCE.to_vec()))
    }

    pub fn with_spec(spec: MergeSpec) -> Self {
        let (published, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            reconciler: Reconciler::new(spec),
            inputs: Mutex::new(Inputs::default()),
            published,
        }
    }

    /// Replace the declared collection and republish.
    pub fn apply_config(&self, targets: &[Target]) -> Result<(), CoreError> {
        self.apply(Source::Config, to_records(targets)?)
    }

    /// Replace the observed collection and republish.
    pub fn apply_system(&self, targets: &[Target]) -> Result<(), CoreError> {
        self.apply(Source::System, to_records(targets)?)
    }

    /// The most recently published reconciliation.
    pub fn snapshot(&self) -> Arc<Vec<MergedRecord>> {
        self.published.borrow().clone()
    }

    /// Watch for published reconciliations.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<MergedRecord>>> {
        self.published.subscribe()
    }

    // Reconciles against the candidate input before committing it, so
    // a failed run leaves both the inputs and the published snapshot
    // exactly as they were.
    fn apply(
        &self,
        source: Source,
        records: Vec<serde_json::Map<String, Value>>,
    ) -> Result<(), CoreError> {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);

        let merged = match source {
            Source::Config => self.reconciler.run(&records, &inputs.system),
            Source::System => self.reconciler.run(&inputs.config, &records),
        }?;

        match source {
            Source::Config => inputs.config = records,
            Source::System => inputs.system = records,
        }
        drop(inputs);

        tracing::debug!(source = %source, records = merged.len(), "published reconciliation");
        self.published.send_replace(Arc::new(merged));
        Ok(())
    }
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_records(targets: &[Target]) -> Result<Vec<serde_json::Map<String, Value>>, CoreError> {
    targets
        .iter()
        .map(|target| match serde_json::to_value(target)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Config {
                message: format!("target serialized to non-object JSON: {other}"),
            }),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reconcile::Status;

    fn declared(name: &str, address: &str, port: u32) -> Target {
        Target {
            name: name.to_owned(),
            address: address.to_owned(),
            port,
            interface: "default".to_owned(),
            ibft: false,
            connected: false,
            startup: None,
            locked: false,
        }
    }

    #[test]
    fn applying_either_source_republishes() {
        let store = SourceStore::new();
        assert!(store.snapshot().is_empty());

        store
            .apply_config(&[declared("t1", "10.0.0.1", 3260)])
            .unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, Status::Missing);

        let mut observed = declared("t1", "10.0.0.1", 3260);
        observed.connected = true;
        store.apply_system(&[observed]).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].status, Status::Connected);
    }

    #[tokio::test]
    async fn subscribers_are_pushed_every_publication() {
        let store = SourceStore::new();
        let mut updates = store.subscribe();

        store
            .apply_system(&[declared("t1", "10.0.0.1", 3260)])
            .unwrap();

        updates.changed().await.unwrap();
        let records = updates.borrow_and_update().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Disconnected);
    }

    #[test]
    fn failed_reconciliation_preserves_the_published_snapshot() {
        // A primary key the Target type cannot satisfy makes every
        // apply fail after the first input is in place.
        let store = SourceStore::with_spec(MergeSpec::new(
            ["name", "uuid"],
            SOURCE_PRECEDENCE.to_vec(),
        ));

        assert!(store.apply_config(&[declared("t1", "10.0.0.1", 3260)]).is_err());
        assert!(store.snapshot().is_empty());

        // Valid empty input still publishes fine afterwards.
        store.apply_config(&[]).unwrap();
        assert!(store.snapshot().is_empty());
    }
}
