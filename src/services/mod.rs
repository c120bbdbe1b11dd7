// Service exports
pub mod cache;
pub mod ghl;
pub mod mapbox;
pub mod snapshot;

pub use cache::{CacheError, CacheKey, KeyValueStore, MemoryStore, RedisStore};
pub use ghl::{ContactDirectory, DirectoryError, GhlClient};
pub use mapbox::{GeocodeClient, GeocodeError, MapboxClient};
pub use snapshot::ContactSnapshot;
