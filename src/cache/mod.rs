pub mod metadata;
pub mod session;
pub mod store;
pub mod ttl_cache;

pub use metadata::MetadataCache;
pub use session::SessionState;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use ttl_cache::{CacheEntry, CacheSource, Clock, Lookup, ManualClock, SystemClock, TtlCache};
