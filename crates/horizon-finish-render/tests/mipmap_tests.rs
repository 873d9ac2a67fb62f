//! Mip-map cache tests.

use std::sync::Arc;
use std::thread;

use horizon_finish_render::{
    Argb, MipmapCache, MipmapCacheConfig, MipmapChain, PixelBuffer, RenderTarget, ResizeFilter,
};

fn make_master(width: u32, height: u32) -> Arc<PixelBuffer> {
    let mut img = PixelBuffer::from_color(width, height, Argb::rgb(200, 180, 40));
    img.set_pixel(width / 2, height / 2, Argb::BLACK);
    Arc::new(img)
}

fn chain_bytes(width: u32, height: u32) -> usize {
    MipmapChain::build(&PixelBuffer::new(width, height), ResizeFilter::Triangle).size_bytes()
}

#[test]
fn test_best_fit_for_512_master() {
    let cache = MipmapCache::with_defaults();
    let master = make_master(512, 384);

    let mid = cache.variant(&master, 100);
    assert!((100..200).contains(&mid.width()), "width {}", mid.width());

    assert!(Arc::ptr_eq(&cache.variant(&master, 512), &master));

    let smallest = cache.variant(&master, 1);
    let chain = cache.chain(&master);
    let last = chain.level(chain.len()).unwrap();
    assert!(Arc::ptr_eq(&smallest, last));
    assert_eq!(smallest.width(), 2);
}

#[test]
fn test_every_target_gets_a_wide_enough_level() {
    let cache = MipmapCache::with_defaults();
    let master = make_master(300, 300);
    for target in 1..=300 {
        let level = cache.variant(&master, target);
        assert!(level.width() >= target, "target {target}");
        assert!(level.width() < target * 2, "target {target}");
    }
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_concurrent_requests_build_once() {
    let cache = Arc::new(MipmapCache::with_defaults());
    let master = make_master(256, 256);

    thread::scope(|s| {
        for i in 0..8u32 {
            let cache = Arc::clone(&cache);
            let master = Arc::clone(&master);
            s.spawn(move || {
                for j in 0..10u32 {
                    let level = cache.variant(&master, 20 + i + j);
                    assert!(level.width() >= 20 + i + j);
                }
            });
        }
    });

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 79);
    assert_eq!(stats.masters, 1);
}

#[test]
fn test_lru_eviction_honours_bound() {
    let per_chain = chain_bytes(64, 64);
    let cache = MipmapCache::new(MipmapCacheConfig::default().with_max_size_bytes(per_chain * 2));
    let a = make_master(64, 64);
    let b = make_master(64, 64);
    let c = make_master(64, 64);

    cache.variant(&a, 8);
    cache.variant(&b, 8);
    assert_eq!(cache.len(), 2);

    // Touch `a` so `b` becomes the least recently used
    cache.variant(&a, 16);
    cache.variant(&c, 8);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert!(stats.size_bytes <= stats.max_size_bytes);
    assert!(cache.contains(&a));
    assert!(!cache.contains(&b));
    assert!(cache.contains(&c));

    // Evicted chains are rebuilt on demand with the same result
    assert_eq!(cache.variant(&b, 8).width(), 8);
    assert_eq!(cache.stats().misses, 4);
}

#[test]
fn test_mutated_master_is_not_served_stale_levels() {
    let cache = MipmapCache::with_defaults();
    let mut master = PixelBuffer::from_color(64, 64, Argb::WHITE);
    let before = cache.variant(&Arc::new(master.clone()), 8);

    master.fill(Argb::BLACK);
    let after = cache.variant(&Arc::new(master), 8);
    assert_eq!(before.get_pixel(0, 0), Some(Argb::WHITE));
    assert_eq!(after.get_pixel(0, 0), Some(Argb::BLACK));
}

#[test]
fn test_render_targets_share_cache() {
    let cache = MipmapCache::with_defaults();
    let master = make_master(400, 400);

    let preview = RenderTarget::Preview.resample(&cache, &master, 90).unwrap();
    let export = RenderTarget::Export.resample(&cache, &master, 90).unwrap();
    assert_eq!(preview.dimensions(), (90, 90));
    assert_eq!(export.dimensions(), (90, 90));

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}
