/// Caller-supplied task identity. Uniqueness is not enforced.
pub type TaskId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
