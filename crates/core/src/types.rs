/// Bulk actions are identified by a client-chosen string id.
pub type BulkActionId = String;

/// Target databases are identified by the id they are configured under.
pub type DatabaseId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
