pub mod aggregate;
pub mod filter;
pub mod types;
pub mod zoom;

pub use aggregate::{merge_adjacent, AggregateEvent, Span};
pub use filter::Filter;
pub use types::*;
pub use zoom::{RangeDivision, TimeRange, TimeUnit, ZoomParams};
