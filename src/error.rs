use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DashError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("token exchange failed: {0}")]
    TokenHttp(String),

    #[error("token endpoint returned status {status}: {message}")]
    TokenStatus { status: u16, message: String },

    #[error("token response missing access token: {0}")]
    TokenMalformed(String),

    #[error("activities request failed: {0}")]
    ActivitiesHttp(String),

    #[error("activities endpoint returned status {status}: {message}")]
    ActivitiesStatus { status: u16, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to write activity cache: {0}")]
    CacheWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DashError {
    /// Auth failures abort the whole pipeline before any page is requested;
    /// the caller reports them separately from fetch failures.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            DashError::MissingCredential(_)
                | DashError::TokenHttp(_)
                | DashError::TokenStatus { .. }
                | DashError::TokenMalformed(_)
        )
    }
}
