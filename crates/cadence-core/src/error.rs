use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// A referenced event, instance, rule or action item does not exist.
    /// The message names which identifier failed to resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An operation referenced entities that do not belong together,
    /// e.g. a cut instance owned by a different event than claimed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A benign uniqueness race that could not be resolved by re-reading.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid recurrence rule: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Multiple rows matched a short id prefix: (id, display name) pairs.
    #[error("Ambiguous ID provided")]
    AmbiguousId(Vec<(String, String)>),

    #[error("An unknown error occurred")]
    Unknown,
}

/// Field-level violations collected while validating a rule payload.
///
/// Validation reports every problem it finds rather than stopping at the
/// first, so callers can surface a complete list to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The payload field the violation applies to.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Single-violation convenience used by update guards.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation {
                field,
                message: message.into(),
            }],
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for v in &self.violations {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
            first = false;
        }
        Ok(())
    }
}
