/// Device-side timestamps are Unix epoch milliseconds.
pub type EpochMillis = i64;

/// All locally generated timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
