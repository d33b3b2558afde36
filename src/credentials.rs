use std::fmt;

use crate::error::DashError;

pub const CLIENT_ID_VAR: &str = "STRAVA_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "STRAVA_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "STRAVA_REFRESH_TOKEN";

/// The three opaque secrets the token exchange needs. Values come from the
/// environment and stay out of logs; `Debug` redacts everything.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, DashError> {
        Ok(Self {
            client_id: require(CLIENT_ID_VAR)?,
            client_secret: require(CLIENT_SECRET_VAR)?,
            refresh_token: require(REFRESH_TOKEN_VAR)?,
        })
    }

    pub fn new(client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

fn require(name: &'static str) -> Result<String, DashError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(DashError::MissingCredential(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new("12345", "s3cret", "r3fresh");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("r3fresh"));
        assert!(rendered.contains("<redacted>"));
    }
}
