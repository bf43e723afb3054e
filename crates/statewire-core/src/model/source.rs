use serde::{Deserialize, Serialize};

/// Where a record's data came from.
///
/// `Config` is the declared state the user asked for; `System` is what
/// the backend currently observes. Ordered so source sets serialize
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Observed state reported by the backend.
    System,
    /// Declared state from the user's configuration.
    Config,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::System => f.write_str("system"),
            Source::Config => f.write_str("config"),
        }
    }
}
