//! Settings persistence and finisher integration tests.

use std::sync::Arc;

use horizon_finish::prelude::*;
use horizon_finish::MipmapCacheSettings;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("finish.toml");

    let settings = FinishSettings::default()
        .with_finish_style(FinishStyle::Margin { bleed_pt: 12.0 })
        .with_dpi(600.0)
        .with_render_target(RenderTarget::Export)
        .with_cache_size_mb(24);
    settings.save_toml(&path).unwrap();

    let loaded = FinishSettings::load_toml(&path).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.mipmap_cache, MipmapCacheSettings { max_size_mb: 24 });
}

#[test]
fn test_save_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finish.toml");

    FinishSettings::default().save_toml(&path).unwrap();
    let updated = FinishSettings::default().with_dpi(150.0);
    updated.save_toml(&path).unwrap();

    assert_eq!(FinishSettings::load_toml(&path).unwrap().dpi, 150.0);
    // Only the settings file remains; the temporary file was renamed
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = FinishSettings::load_toml(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(SettingsError::Io(_))));
}

#[test]
fn test_load_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finish.toml");
    std::fs::write(&path, "finish = \"margin\"\nbleed_margin_pt = -4.0\n").unwrap();
    assert!(matches!(
        FinishSettings::load_toml(&path),
        Err(SettingsError::Finish(FinishError::InvalidMargin(_)))
    ));

    std::fs::write(&path, "finish = [1, 2]\n").unwrap();
    assert!(matches!(
        FinishSettings::load_toml(&path),
        Err(SettingsError::Parse(_))
    ));
}

#[test]
fn test_finisher_applies_margin_style() {
    let settings = FinishSettings::from_toml_str(
        r#"
        finish = "margin"
        bleed_margin_pt = 9.0
        dpi = 144.0
        "#,
    )
    .unwrap();
    let finisher = EdgeFinisher::new(settings).unwrap();
    assert_eq!(finisher.margin_px(), 18);

    let face = PixelBuffer::from_color(50, 70, Argb::rgb(40, 40, 40));
    let out = finisher.finish(&face, None).unwrap();
    assert_eq!(out.dimensions(), (86, 106));
    assert_eq!(out.get_pixel(0, 0), Some(Argb::rgb(40, 40, 40)));
}

#[test]
fn test_finisher_applies_round_style() {
    let settings = FinishSettings::default()
        .with_finish_style(FinishStyle::Round { radius_pt: 9.0 })
        .with_dpi(72.0);
    let finisher = EdgeFinisher::new(settings).unwrap();

    let face = PixelBuffer::from_color(40, 40, Argb::WHITE);
    let out = finisher.finish(&face, None).unwrap();
    assert!(out.has_alpha());
    assert_eq!(out.get_pixel(0, 0).map(|p| p.alpha()), Some(0));
    assert_eq!(out.get_pixel(20, 20), Some(Argb::WHITE));
}

#[test]
fn test_settings_can_change_at_runtime() {
    let finisher = EdgeFinisher::with_defaults();
    let face = PixelBuffer::from_color(10, 10, Argb::WHITE);
    assert_eq!(finisher.finish(&face, None).unwrap().dimensions(), (10, 10));

    finisher
        .set_settings(
            FinishSettings::default()
                .with_finish_style(FinishStyle::Margin { bleed_pt: 2.0 })
                .with_dpi(72.0),
        )
        .unwrap();
    assert_eq!(finisher.style(), FinishStyle::Margin { bleed_pt: 2.0 });
    assert_eq!(finisher.finish(&face, None).unwrap().dimensions(), (14, 14));
}

#[test]
fn test_finisher_scales_through_its_cache() {
    let settings = FinishSettings::default().with_render_target(RenderTarget::Preview);
    let finisher = Arc::new(EdgeFinisher::new(settings).unwrap());
    let master = Arc::new(PixelBuffer::from_color(320, 240, Argb::rgb(7, 7, 7)));

    std::thread::scope(|s| {
        for _ in 0..4 {
            let finisher = Arc::clone(&finisher);
            let master = Arc::clone(&master);
            s.spawn(move || {
                let scaled = finisher.scaled(&master, 100).unwrap();
                assert_eq!(scaled.dimensions(), (100, 75));
            });
        }
    });

    let stats = finisher.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 3);
}
