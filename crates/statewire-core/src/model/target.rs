// ── iSCSI target domain types ──

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// When a node session is brought up, in open-iscsi terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Onboot,
    Manual,
    Automatic,
}

impl Startup {
    pub fn as_str(self) -> &'static str {
        match self {
            Startup::Onboot => "onboot",
            Startup::Manual => "manual",
            Startup::Automatic => "automatic",
        }
    }
}

impl std::fmt::Display for Startup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Startup {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onboot" => Ok(Startup::Onboot),
            "manual" => Ok(Startup::Manual),
            "automatic" => Ok(Startup::Automatic),
            other => Err(CoreError::Config {
                message: format!("unknown startup mode '{other}'"),
            }),
        }
    }
}

/// One iSCSI target as either declared or observed.
///
/// (`name`, `address`, `port`) is the reconciliation identity; the
/// remaining fields are payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target IQN.
    pub name: String,
    pub address: String,
    pub port: u32,
    /// Initiator interface the session runs over, e.g. "default".
    pub interface: String,
    /// Whether the node was configured through iBFT firmware.
    #[serde(default)]
    pub ibft: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<Startup>,
    /// A locked record must never be offered actions, regardless of
    /// status. Firmware-configured (iBFT) nodes are the usual case.
    #[serde(default)]
    pub locked: bool,
}

/// Backend outcome of a login attempt against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    /// The session came up but the requested startup mode was rejected.
    InvalidStartup,
    Failed,
}

impl TryFrom<u32> for LoginResult {
    type Error = CoreError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LoginResult::Success),
            1 => Ok(LoginResult::InvalidStartup),
            2 => Ok(LoginResult::Failed),
            other => Err(CoreError::UnknownLoginCode(other)),
        }
    }
}
