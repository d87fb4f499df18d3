use timeline_core::EventId;

/// Failures inside the event store.
///
/// Public query methods log these and degrade to an empty or sentinel result;
/// they surface directly only from [`crate::EventStore::open`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt event row {event_id}: {detail}")]
    CorruptRow { event_id: EventId, detail: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
