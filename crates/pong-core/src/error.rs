use std::fmt;

/// Reasons an action payload is rejected before any handler sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyId(&'static str),
    NonFinite(&'static str),
    ZeroQuaternion(&'static str),
    PlayerIndexOutOfRange(u8),
    EmptyMove,
    LogTooLong(usize),
    WrongPrefab { expected: &'static str, found: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId(field) => write!(f, "{field} must not be empty"),
            Self::NonFinite(field) => write!(f, "{field} has a non-finite component"),
            Self::ZeroQuaternion(field) => write!(f, "{field} is a zero-length quaternion"),
            Self::PlayerIndexOutOfRange(i) => write!(f, "player index {i} out of range"),
            Self::EmptyMove => write!(f, "move carries no pose or impulse"),
            Self::LogTooLong(len) => write!(f, "log line too long: {len} bytes"),
            Self::WrongPrefab { expected, found } => {
                write!(f, "expected prefab {expected}, got {found}")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors surfaced by rule handlers and tick helpers. None of them are fatal;
/// the per-game loop logs them and carries on next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PongError {
    Validation(ValidationError),
    MissingBinding(String),
    Configuration(String),
}

impl fmt::Display for PongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "invalid action: {e}"),
            Self::MissingBinding(msg) => write!(f, "missing binding: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for PongError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for PongError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl PongError {
    /// Emit this error at the level its kind calls for.
    pub fn log(&self, game: &str) {
        match self {
            Self::Validation(e) => tracing::warn!(game, error = %e, "action rejected"),
            Self::MissingBinding(msg) => tracing::debug!(game, %msg, "skipping game this tick"),
            Self::Configuration(msg) => tracing::error!(game, %msg, "configuration error"),
        }
    }
}
