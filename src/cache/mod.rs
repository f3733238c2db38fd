//! # Cache Module
//!
//! Bounded metadata cache for Open Jukebox.
//!
//! Resolving a track through yt-dlp is the most expensive operation the bot
//! performs, so full (non-flat) resolutions are kept in a process-wide
//! [`ResolutionCache`] and shared across every guild.
//!
//! ## Eviction
//!
//! The cache holds at most `RESOLVER_CACHE_SIZE` entries (50 by default).
//! When full, the **oldest inserted** entry is evicted. Reads never reorder
//! entries, so this is FIFO rather than LRU. There is no TTL: an entry lives
//! until it is pushed out.
//!
//! ## What is cached
//!
//! Only non-flat lookups. Flat lookups enumerate playlists and must always
//! reflect the current playlist contents, so they bypass the cache entirely.
//!
//! ## Example Usage
//!
//! ```rust
//! use open_jukebox::cache::{CacheKey, BoundedCache};
//!
//! let cache: BoundedCache<CacheKey, u32> = BoundedCache::new(2);
//! cache.insert(CacheKey::new("https://youtu.be/a", false), 1);
//! cache.insert(CacheKey::new("https://youtu.be/b", false), 2);
//! cache.insert(CacheKey::new("https://youtu.be/c", false), 3);
//!
//! assert!(!cache.contains(&CacheKey::new("https://youtu.be/a", false)));
//! assert_eq!(cache.len(), 2);
//! ```

pub mod fifo_cache;

pub use fifo_cache::{BoundedCache, CacheMetrics};

use crate::sources::RawInfo;

/// Process-wide cache of resolved track metadata.
pub type ResolutionCache = BoundedCache<CacheKey, RawInfo>;

/// Cache key: the user-supplied reference plus the resolution mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_ref: String,
    pub flat: bool,
}

impl CacheKey {
    pub fn new(source_ref: impl Into<String>, flat: bool) -> Self {
        Self {
            source_ref: source_ref.into(),
            flat,
        }
    }
}
