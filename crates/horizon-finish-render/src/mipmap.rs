//! Mip-map cache for pre-scaled image variants.
//!
//! Painting a large master image at a small size with a single resample
//! step loses detail and is slow. [`MipmapCache`] keeps, per master, a
//! chain of successively halved copies and hands out the smallest one that
//! is still at least as wide as the requested width; the caller then does a
//! final, cheap resample from there.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use horizon_finish_render::{MipmapCache, MipmapCacheConfig, PixelBuffer};
//!
//! let cache = MipmapCache::new(MipmapCacheConfig::default().with_max_size_mb(32));
//! let master = Arc::new(PixelBuffer::from_file("portrait.png")?);
//!
//! // 512 wide master: this returns the 128 wide level
//! let level = cache.variant(&master, 100);
//! assert!(level.width() >= 100);
//! ```
//!
//! # Thread Safety
//!
//! The cache is `Send + Sync`. The table is guarded by a mutex and chains
//! are built while it is held, so concurrent requests for the same master
//! build its chain exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::logging::{PerfSpan, span_names, targets};
use crate::pixel_buffer::{ImageId, PixelBuffer, ResizeFilter};

/// Configuration for the mip-map cache.
#[derive(Debug, Clone)]
pub struct MipmapCacheConfig {
    /// Maximum total size of cached levels in bytes.
    /// When exceeded, least recently used chains are evicted.
    /// Default: 64 MB.
    pub max_size_bytes: usize,
    /// Filter used to halve each level.
    /// Default: Catmull-Rom.
    pub filter: ResizeFilter,
}

impl Default for MipmapCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024, // 64 MB
            filter: ResizeFilter::CatmullRom,
        }
    }
}

impl MipmapCacheConfig {
    /// Set the maximum cache size in megabytes, saturating at `usize::MAX`
    /// bytes.
    #[must_use]
    pub fn with_max_size_mb(mut self, mb: usize) -> Self {
        self.max_size_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    /// Set the maximum cache size in bytes.
    #[must_use]
    pub fn with_max_size_bytes(mut self, bytes: usize) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Set the downsampling filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// The halved copies of one master image.
///
/// Level 0 is the master itself and is not stored; `level(1)` is half its
/// size, `level(2)` a quarter, and so on.
pub struct MipmapChain {
    master_id: ImageId,
    levels: Vec<Arc<PixelBuffer>>,
    size_bytes: usize,
}

impl MipmapChain {
    /// Number of levels `min(floor(log2 w), floor(log2 h))` for a master.
    pub fn level_count(width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        width.ilog2().min(height.ilog2()) as usize
    }

    /// Build the chain for a master, each level resampled from the last.
    pub fn build(master: &PixelBuffer, filter: ResizeFilter) -> Self {
        let _span = PerfSpan::new(span_names::MIPMAP_BUILD);

        let count = Self::level_count(master.width(), master.height());
        let mut levels: Vec<Arc<PixelBuffer>> = Vec::with_capacity(count);
        for _ in 0..count {
            let prev = levels.last().map_or(master, |l| l.as_ref());
            let (w, h) = ((prev.width() / 2).max(1), (prev.height() / 2).max(1));
            let next = prev.resize(w, h, filter);
            levels.push(Arc::new(next));
        }
        let size_bytes = levels.iter().map(|l| l.size_bytes()).sum();

        debug!(
            target: targets::MIPMAP,
            id = master.id().as_u64(),
            width = master.width(),
            height = master.height(),
            levels = count,
            size_bytes,
            "built chain"
        );

        Self {
            master_id: master.id(),
            levels,
            size_bytes,
        }
    }

    /// Identity of the master this chain was built from.
    #[inline]
    pub fn master_id(&self) -> ImageId {
        self.master_id
    }

    /// Number of stored levels (excluding the master).
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level `n`, where level 1 is the first halved copy.
    pub fn level(&self, n: usize) -> Option<&Arc<PixelBuffer>> {
        n.checked_sub(1).and_then(|i| self.levels.get(i))
    }

    /// Memory used by the stored levels.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Pick the level to draw at `target_width`.
    ///
    /// Walks down the chain and stops before the first level narrower than
    /// the target; if none is, the smallest level is used.
    pub fn select(&self, master: &Arc<PixelBuffer>, target_width: u32) -> Arc<PixelBuffer> {
        let mut best = master;
        for level in &self.levels {
            if level.width() < target_width {
                break;
            }
            best = level;
        }
        Arc::clone(best)
    }
}

impl std::fmt::Debug for MipmapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MipmapChain")
            .field("master_id", &self.master_id.as_u64())
            .field(
                "widths",
                &self.levels.iter().map(|l| l.width()).collect::<Vec<_>>(),
            )
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

struct CacheEntry {
    chain: Arc<MipmapChain>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ImageId, CacheEntry>,
    size_bytes: usize,
    /// Monotonic access counter used for LRU ordering.
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Evict least recently used chains, except `keep`, until within `max`.
    fn evict_to(&mut self, max: usize, keep: ImageId) {
        while self.size_bytes > max {
            let victim = self
                .entries
                .iter()
                .filter(|(id, _)| **id != keep)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| *id);
            let Some(id) = victim else {
                break;
            };
            if let Some(entry) = self.entries.remove(&id) {
                self.size_bytes -= entry.chain.size_bytes();
                self.evictions += 1;
                debug!(
                    target: targets::MIPMAP,
                    id = id.as_u64(),
                    size_bytes = entry.chain.size_bytes(),
                    "evicted chain"
                );
            }
        }
    }
}

/// A thread-safe, size-bounded cache of mip-map chains keyed by master
/// identity.
///
/// Chains are created lazily on the first request that needs a level below
/// the master, and evicted least-recently-used first when the configured
/// size is exceeded. Eviction never affects results: an evicted chain is
/// rebuilt on the next request.
pub struct MipmapCache {
    config: MipmapCacheConfig,
    state: Mutex<CacheState>,
}

impl MipmapCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: MipmapCacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Create a new cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MipmapCacheConfig::default())
    }

    #[inline]
    pub fn config(&self) -> &MipmapCacheConfig {
        &self.config
    }

    /// Get the best variant of `master` to draw at `target_width` pixels.
    ///
    /// Widths below 1 are treated as 1. If the master is no wider than the
    /// target the master itself is returned.
    pub fn variant(&self, master: &Arc<PixelBuffer>, target_width: u32) -> Arc<PixelBuffer> {
        let target_width = target_width.max(1);
        if master.width() <= target_width {
            return Arc::clone(master);
        }
        self.chain(master).select(master, target_width)
    }

    /// Get the chain for a master, building it if needed.
    pub fn chain(&self, master: &PixelBuffer) -> Arc<MipmapChain> {
        let id = master.id();
        let mut state = self.state.lock();

        let tick = state.next_tick();
        if let Some(entry) = state.entries.get_mut(&id) {
            entry.last_used = tick;
            let chain = Arc::clone(&entry.chain);
            state.hits += 1;
            trace!(target: targets::MIPMAP, id = id.as_u64(), "hit");
            return chain;
        }
        state.misses += 1;

        let chain = Arc::new(MipmapChain::build(master, self.config.filter));
        if chain.size_bytes() > self.config.max_size_bytes {
            debug!(
                target: targets::MIPMAP,
                id = id.as_u64(),
                size_bytes = chain.size_bytes(),
                max_size_bytes = self.config.max_size_bytes,
                "chain exceeds cache size, not retained"
            );
            return chain;
        }

        state.size_bytes += chain.size_bytes();
        state.entries.insert(
            id,
            CacheEntry {
                chain: Arc::clone(&chain),
                last_used: tick,
            },
        );
        state.evict_to(self.config.max_size_bytes, id);
        chain
    }

    /// Check whether a chain for this master is cached.
    pub fn contains(&self, master: &PixelBuffer) -> bool {
        self.state.lock().entries.contains_key(&master.id())
    }

    /// Drop the chain for a master, if cached.
    pub fn remove(&self, master: &PixelBuffer) -> bool {
        let mut state = self.state.lock();
        match state.entries.remove(&master.id()) {
            Some(entry) => {
                state.size_bytes -= entry.chain.size_bytes();
                true
            }
            None => false,
        }
    }

    /// Number of cached masters.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Drop every cached chain.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.size_bytes = 0;
    }

    /// Reset hit, miss and eviction counters.
    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
    }

    /// Get cache statistics.
    pub fn stats(&self) -> MipmapCacheStats {
        let state = self.state.lock();
        MipmapCacheStats {
            masters: state.entries.len(),
            levels: state.entries.values().map(|e| e.chain.len()).sum(),
            size_bytes: state.size_bytes,
            max_size_bytes: self.config.max_size_bytes,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

impl Default for MipmapCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for MipmapCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MipmapCache")
            .field("masters", &stats.masters)
            .field("size_mb", &stats.size_mb())
            .field("max_size_mb", &stats.max_size_mb())
            .field("hit_rate", &format!("{:.1}%", stats.hit_rate() * 100.0))
            .finish()
    }
}

/// Statistics about the mip-map cache.
#[derive(Debug, Clone, PartialEq)]
pub struct MipmapCacheStats {
    /// Number of masters with a cached chain.
    pub masters: usize,
    /// Total number of cached levels.
    pub levels: usize,
    /// Current size in bytes.
    pub size_bytes: usize,
    /// Maximum size in bytes.
    pub max_size_bytes: usize,
    /// Number of chain lookups served from the cache.
    pub hits: u64,
    /// Number of chains built.
    pub misses: u64,
    /// Number of chains evicted to stay within the size limit.
    pub evictions: u64,
}

impl MipmapCacheStats {
    /// Get the current size in megabytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }

    /// Get the maximum size in megabytes.
    pub fn max_size_mb(&self) -> f64 {
        self.max_size_bytes as f64 / 1024.0 / 1024.0
    }

    /// Get the usage percentage (0.0 to 100.0).
    pub fn usage_percent(&self) -> f64 {
        if self.max_size_bytes == 0 {
            0.0
        } else {
            (self.size_bytes as f64 / self.max_size_bytes as f64) * 100.0
        }
    }

    /// Hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
