//! Cache domain - Response cache and key generation

mod key;
mod response_cache;

pub use key::{ResponseCacheKey, hash_bytes};
pub use response_cache::{CacheStats, ResponseCache, ResponseCacheConfig};
