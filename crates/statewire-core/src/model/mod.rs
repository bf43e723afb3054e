// ── Domain model ──
//
// Canonical representations of the iSCSI entities the sync layer
// reconciles. Field names double as wire/JSON names: the reconciler
// compares serialized records, so renames here are breaking changes.

pub mod auth;
pub mod source;
pub mod target;

pub use auth::Auth;
pub use source::Source;
pub use target::{LoginResult, Startup, Target};
