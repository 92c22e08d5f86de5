use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Malformed request shape or values. No writes performed.
    Validation(&'static str),
    /// The proposed interval clashes with this existing class.
    Conflict(Ulid),
    NotFound(Ulid),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::Validation(msg) => write!(f, "validation failed: {msg}"),
            SchedulerError::Conflict(id) => write!(f, "clash with class: {id}"),
            SchedulerError::NotFound(id) => write!(f, "not found: {id}"),
        }
    }
}

impl std::error::Error for SchedulerError {}
