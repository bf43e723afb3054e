// statewire-core: domain model and state reconciliation between
// statewire-api and UI consumers.

pub mod error;
pub mod model;
pub mod monitor;
pub mod reconcile;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use model::{Auth, LoginResult, Source, Startup, Target};
pub use monitor::{RefreshHint, TargetMonitor};
pub use reconcile::{actions_for, Action, Effect, MergeSpec, MergedRecord, Reconciler, Status};
pub use store::SourceStore;
