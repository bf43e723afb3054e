// ── CHAP authentication ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CHAP credentials for discovery or login, both directions.
///
/// Halves are independent options so a form can be partially filled;
/// [`to_params`](Self::to_params) only emits a credential pair when
/// both halves of it are present, so the backend never sees a username
/// without its password or vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Mutual CHAP: the credentials the target uses to authenticate
    /// back to the initiator.
    pub reverse_username: Option<String>,
    pub reverse_password: Option<String>,
}

impl Auth {
    pub fn none() -> Self {
        Self::default()
    }

    /// Wire parameters for a discovery or login request.
    pub fn to_params(&self) -> serde_json::Map<String, Value> {
        let mut params = serde_json::Map::new();
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            params.insert("Username".to_owned(), Value::String(username.clone()));
            params.insert("Password".to_owned(), Value::String(password.clone()));
        }
        if let (Some(username), Some(password)) = (&self.reverse_username, &self.reverse_password)
        {
            params.insert(
                "ReverseUsername".to_owned(),
                Value::String(username.clone()),
            );
            params.insert(
                "ReversePassword".to_owned(),
                Value::String(password.clone()),
            );
        }
        params
    }
}
