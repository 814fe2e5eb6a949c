/// The keyset error type.
///
/// Every variant that wraps a lower failure carries the stage that failed, so
/// the message printed at the command boundary says where creation stopped.
#[derive(Debug, thiserror::Error)]
pub enum KeysetError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} keyset already exists")]
    AlreadyExists(String),

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Signing error while {context}: {message}")]
    Signing { context: String, message: String },

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Failed fetching keyset: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Trust anchor error: {0}")]
    TrustAnchor(String),
}

impl KeysetError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        KeysetError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn signing(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        KeysetError::Signing {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Re-labels the stage of an error while keeping its kind.
    ///
    /// Used by the orchestrator so a failure deep inside a role reports the
    /// role being generated.
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            KeysetError::Io { context, source } => KeysetError::Io {
                context: format!("{}: {}", stage, context),
                source,
            },
            KeysetError::Signing { context, message } => KeysetError::Signing {
                context: format!("{}: {}", stage, context),
                message,
            },
            KeysetError::ExternalTool(msg) => {
                KeysetError::ExternalTool(format!("{}: {}", stage, msg))
            }
            other => other,
        }
    }
}

pub type Result<T, E = KeysetError> = core::result::Result<T, E>;
