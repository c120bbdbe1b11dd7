// Core algorithm exports
pub mod batch;
pub mod distance;
pub mod fields;
pub mod history;
pub mod nearby;
pub mod search;
pub mod sorting;

pub use batch::{BatchError, BatchGeocodeController, BatchSettings, PauseToken, RunMode};
pub use distance::distance_miles;
pub use fields::{sanitize_numeric, CoordinateFields, ResolveField};
pub use history::SearchHistoryStore;
pub use nearby::{NearbyService, SearchError, SearchOutcome};
pub use search::{filter_by_name, RadiusSearchEngine};
pub use sorting::{FieldKind, SortKey, SortableField};
