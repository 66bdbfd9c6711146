/// Typed errors for netshui WiFi operations
use thiserror::Error;

/// Result type alias for WiFi operations
pub type WifiResult<T> = Result<T, WifiError>;

/// Errors that can occur during WiFi operations
#[derive(Error, Debug)]
pub enum WifiError {
    #[error("Parameter validation failed: network name must not be empty")]
    EmptyName,

    #[error("Parameter validation failed: password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Malformed profile XML: {0}")]
    MalformedXml(String),

    #[error("Profile XML is missing the <{0}> element")]
    MissingElement(&'static str),

    #[error("{action} failed: {output}")]
    CommandFailed { action: &'static str, output: String },

    #[error("Connection failed: {output}\n{detail}")]
    ConnectFailed { output: String, detail: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Could not locate the desktop folder")]
    NoDesktop,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WifiError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        WifiError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Validation failures raised while building a profile
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WifiError::EmptyName | WifiError::PasswordTooShort { .. }
        )
    }
}
