pub mod aggregate;
pub mod config;
pub mod error;
pub mod lock;
pub mod paths;
pub mod predicate;
pub mod repository;
pub mod schema;
pub mod store;

pub use config::{parse_offset, TimelineConfig};
pub use error::StoreError;
pub use lock::CaseLock;
pub use paths::TimelinePaths;
pub use predicate::{translate, SqlPredicate};
pub use repository::DbInfoKey;
pub use store::{EventStore, EventTransaction, StoreNotice};
