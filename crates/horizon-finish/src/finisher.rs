//! A settings-driven finishing service.

use std::borrow::Cow;
use std::sync::Arc;

use horizon_finish_render::{
    BorderSynthesizer, FinishResult, FinishStyle, MipmapCache, PixelBuffer, RenderTarget,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::settings::{FinishSettings, SettingsResult};

/// Validated settings plus the typed values derived from them.
#[derive(Debug, Clone)]
struct ActiveSettings {
    settings: FinishSettings,
    style: FinishStyle,
    target: RenderTarget,
    margin_px: u32,
}

impl ActiveSettings {
    fn new(settings: FinishSettings) -> SettingsResult<Self> {
        settings.validate()?;
        Ok(Self {
            style: settings.finish_style()?,
            target: settings.render_target()?,
            margin_px: settings.bleed_margin_px()?,
            settings,
        })
    }
}

/// Finishes faces according to [`FinishSettings`] and owns the mip-map
/// cache used to scale artwork.
///
/// `EdgeFinisher` is `Send + Sync`; share one per application (or per
/// document) through an `Arc`. Settings can be replaced while it is in use.
///
/// # Example
///
/// ```ignore
/// use horizon_finish::{EdgeFinisher, FinishSettings, FinishStyle, PixelBuffer};
///
/// let settings = FinishSettings::default()
///     .with_finish_style(FinishStyle::Margin { bleed_pt: 9.0 });
/// let finisher = EdgeFinisher::new(settings)?;
///
/// let face = PixelBuffer::from_file("front.png")?;
/// let finished = finisher.finish(&face, None)?;
/// finished.save("front-print.png")?;
/// ```
pub struct EdgeFinisher {
    active: RwLock<ActiveSettings>,
    cache: MipmapCache,
    synthesizer: BorderSynthesizer,
}

impl EdgeFinisher {
    /// Create a finisher from validated settings.
    pub fn new(settings: FinishSettings) -> SettingsResult<Self> {
        let active = ActiveSettings::new(settings)?;
        Ok(Self {
            cache: MipmapCache::new(active.settings.cache_config()),
            active: RwLock::new(active),
            synthesizer: BorderSynthesizer::new(),
        })
    }

    /// Create a finisher with default settings.
    pub fn with_defaults() -> Self {
        Self::new(FinishSettings::default()).expect("default finish settings should always be valid")
    }

    /// Use a specific synthesizer for bleed margins.
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: BorderSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> FinishSettings {
        self.active.read().settings.clone()
    }

    /// Replace the settings.
    ///
    /// Invalid settings are rejected and the current ones kept. The cache
    /// budget is fixed when the finisher is created.
    pub fn set_settings(&self, settings: FinishSettings) -> SettingsResult<()> {
        let active = ActiveSettings::new(settings)?;
        debug!(
            finish = active.style.name(),
            target = active.target.name(),
            margin_px = active.margin_px,
            "finish settings changed"
        );
        *self.active.write() = active;
        Ok(())
    }

    /// The configured finish style.
    pub fn style(&self) -> FinishStyle {
        self.active.read().style
    }

    /// The configured render target.
    pub fn target(&self) -> RenderTarget {
        self.active.read().target
    }

    /// The bleed margin in pixels at the configured resolution.
    pub fn margin_px(&self) -> u32 {
        self.active.read().margin_px
    }

    /// The mip-map cache.
    pub fn cache(&self) -> &MipmapCache {
        &self.cache
    }

    /// Apply the configured finish style to a face.
    pub fn finish<'a>(
        &self,
        face: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        let (style, dpi) = {
            let active = self.active.read();
            (active.style, active.settings.dpi)
        };
        style.apply_with(&self.synthesizer, face, template, dpi)
    }

    /// Add the configured bleed margin, whatever the finish style.
    pub fn bleed<'a>(
        &self,
        face: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        self.synthesizer.synthesize(face, template, self.margin_px())
    }

    /// Scale a master image to `width` for the configured render target.
    pub fn scaled(&self, master: &Arc<PixelBuffer>, width: u32) -> FinishResult<Arc<PixelBuffer>> {
        self.target().resample(&self.cache, master, width)
    }
}

impl Default for EdgeFinisher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for EdgeFinisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.read();
        f.debug_struct("EdgeFinisher")
            .field("style", &active.style)
            .field("target", &active.target)
            .field("dpi", &active.settings.dpi)
            .field("margin_px", &active.margin_px)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_finish_render::Argb;

    #[test]
    fn test_defaults_match_validated_settings() {
        let finisher = EdgeFinisher::with_defaults();
        let validated = EdgeFinisher::new(FinishSettings::default()).unwrap();
        assert_eq!(finisher.style(), validated.style());
        assert_eq!(finisher.target(), validated.target());
        assert_eq!(finisher.margin_px(), validated.margin_px());
        assert_eq!(finisher.settings(), FinishSettings::default());
        assert_eq!(
            finisher.cache().config().max_size_bytes,
            FinishSettings::default().cache_config().max_size_bytes
        );
    }

    #[test]
    fn test_oversized_cache_is_rejected() {
        let settings = FinishSettings::default().with_cache_size_mb(usize::MAX / 1024);
        assert!(matches!(
            EdgeFinisher::new(settings),
            Err(crate::SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_square_finish_borrows() {
        let finisher = EdgeFinisher::with_defaults();
        let face = PixelBuffer::from_color(10, 10, Argb::WHITE);
        assert!(matches!(finisher.finish(&face, None).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_bleed_ignores_style() {
        let settings = FinishSettings::default().with_bleed_margin_pt(3.0).with_dpi(72.0);
        let finisher = EdgeFinisher::new(settings).unwrap();
        let face = PixelBuffer::from_color(10, 10, Argb::WHITE);
        assert_eq!(finisher.bleed(&face, None).unwrap().dimensions(), (16, 16));
    }

    #[test]
    fn test_rejected_settings_keep_current() {
        let finisher = EdgeFinisher::with_defaults();
        assert!(finisher.set_settings(FinishSettings::default().with_dpi(-1.0)).is_err());
        assert_eq!(finisher.settings(), FinishSettings::default());
    }

    #[test]
    fn test_finisher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EdgeFinisher>();
    }
}
