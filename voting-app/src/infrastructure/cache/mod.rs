mod search_cache;

pub use search_cache::{SearchCache, SEARCH_CACHE_TTL};
