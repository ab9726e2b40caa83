use thiserror::Error;

/// Failure of a single `CompletionProvider::complete` call.
///
/// Every variant is a transport-level failure: the call itself did not
/// produce completion text. Malformed completion text is not an error here;
/// the matching engine handles it as "no match".
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Map an HTTP error status and body message to a provider error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            _ => ProviderError::Status { status, message },
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Failure writing to, or reading from, the page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("element '{0}' not found on page")]
    ElementNotFound(String),

    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("browser session I/O error: {0}")]
    SessionIO(String),

    #[error("browser session command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of the credential/profile store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile not found: {0}")]
    ProfileNotFound(String),
}

/// Run-level failure of one autofill pass.
#[derive(Debug, Error)]
pub enum AutofillError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("no profile configured")]
    MissingProfile,

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AutofillError {
    /// True for the two precondition failures that abort a run before any
    /// field is considered.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AutofillError::MissingCredential | AutofillError::MissingProfile
        )
    }
}
