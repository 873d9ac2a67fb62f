//! Finishing settings and their TOML persistence.
//!
//! [`FinishSettings`] holds everything needed to finish a face: the finish
//! style, bleed and corner sizes in points, the output resolution, the
//! render target and the mip-map cache budget. Settings are stored as TOML:
//!
//! ```toml
//! finish = "margin"
//! bleed_margin_pt = 9.0
//! corner_radius_pt = 9.0
//! dpi = 300.0
//! render_target = "export"
//!
//! [mipmap_cache]
//! max_size_mb = 64
//! ```
//!
//! Missing keys take their default values. Settings are validated after
//! loading, so an unknown style name or a negative margin is reported when
//! the file is read rather than when a face is finished.
//!
//! # Example
//!
//! ```ignore
//! use horizon_finish::{FinishSettings, FinishStyle};
//!
//! let settings = FinishSettings::default()
//!     .with_finish_style(FinishStyle::Round { radius_pt: 6.0 })
//!     .with_dpi(600.0);
//! settings.save_toml("finish.toml")?;
//!
//! let loaded = FinishSettings::load_toml("finish.toml")?;
//! assert_eq!(loaded, settings);
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use horizon_finish_render::{FinishError, FinishStyle, MipmapCacheConfig, RenderTarget};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// File name used for settings in the per-user configuration directory.
pub const SETTINGS_FILE_NAME: &str = "finish.toml";

/// Errors that can occur while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML or has mistyped values.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be converted to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range or a name is not recognised.
    #[error("invalid settings: {0}")]
    Invalid(String),

    /// A finishing size or resolution was rejected.
    #[error(transparent)]
    Finish(#[from] FinishError),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Mip-map cache settings, stored as the `[mipmap_cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MipmapCacheSettings {
    /// Maximum size of cached levels in megabytes.
    pub max_size_mb: usize,
}

impl Default for MipmapCacheSettings {
    fn default() -> Self {
        Self { max_size_mb: 64 }
    }
}

/// Settings for finishing card faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishSettings {
    /// Finish style name: `square`, `round` or `margin`.
    pub finish: String,
    /// Bleed margin width in points, used by the `margin` style.
    pub bleed_margin_pt: f64,
    /// Corner radius in points, used by the `round` style.
    pub corner_radius_pt: f64,
    /// Output resolution in dots per inch.
    pub dpi: f64,
    /// Render target name: `fast-preview`, `preview`, `export` or `print`.
    pub render_target: String,
    /// Mip-map cache budget.
    pub mipmap_cache: MipmapCacheSettings,
}

impl Default for FinishSettings {
    fn default() -> Self {
        Self {
            finish: FinishStyle::Square.name().to_string(),
            bleed_margin_pt: 9.0,
            corner_radius_pt: 9.0,
            dpi: 300.0,
            render_target: RenderTarget::default().name().to_string(),
            mipmap_cache: MipmapCacheSettings::default(),
        }
    }
}

impl FinishSettings {
    // ========================================================================
    // BUILDERS
    // ========================================================================

    /// Use a finish style; its size replaces the matching point setting.
    #[must_use]
    pub fn with_finish_style(mut self, style: FinishStyle) -> Self {
        self.finish = style.name().to_string();
        match style {
            FinishStyle::Square => {}
            FinishStyle::Round { radius_pt } => self.corner_radius_pt = radius_pt,
            FinishStyle::Margin { bleed_pt } => self.bleed_margin_pt = bleed_pt,
        }
        self
    }

    /// Set the bleed margin in points.
    #[must_use]
    pub fn with_bleed_margin_pt(mut self, points: f64) -> Self {
        self.bleed_margin_pt = points;
        self
    }

    /// Set the corner radius in points.
    #[must_use]
    pub fn with_corner_radius_pt(mut self, points: f64) -> Self {
        self.corner_radius_pt = points;
        self
    }

    /// Set the output resolution.
    #[must_use]
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the render target.
    #[must_use]
    pub fn with_render_target(mut self, target: RenderTarget) -> Self {
        self.render_target = target.name().to_string();
        self
    }

    /// Set the mip-map cache budget in megabytes.
    #[must_use]
    pub fn with_cache_size_mb(mut self, mb: usize) -> Self {
        self.mipmap_cache.max_size_mb = mb;
        self
    }

    // ========================================================================
    // TYPED ACCESS
    // ========================================================================

    /// The configured finish style.
    pub fn finish_style(&self) -> SettingsResult<FinishStyle> {
        FinishStyle::from_name(&self.finish, self.corner_radius_pt, self.bleed_margin_pt)
            .ok_or_else(|| SettingsError::Invalid(format!("unknown finish style `{}`", self.finish)))
    }

    /// The configured render target.
    pub fn render_target(&self) -> SettingsResult<RenderTarget> {
        RenderTarget::from_name(&self.render_target).ok_or_else(|| {
            SettingsError::Invalid(format!("unknown render target `{}`", self.render_target))
        })
    }

    /// Mip-map cache configuration for these settings.
    pub fn cache_config(&self) -> MipmapCacheConfig {
        MipmapCacheConfig::default().with_max_size_mb(self.mipmap_cache.max_size_mb)
    }

    /// Bleed margin in whole pixels at the configured resolution.
    pub fn bleed_margin_px(&self) -> SettingsResult<u32> {
        let px = horizon_finish_render::points_to_pixels(self.bleed_margin_pt, self.dpi)?.round();
        if px > f64::from(u32::MAX) {
            return Err(SettingsError::Invalid(format!(
                "bleed margin of {} pt is too large at {} dpi",
                self.bleed_margin_pt, self.dpi
            )));
        }
        Ok(px as u32)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> SettingsResult<()> {
        self.bleed_margin_px()?;
        if self.mipmap_cache.max_size_mb.checked_mul(1024 * 1024).is_none() {
            return Err(SettingsError::Invalid(format!(
                "mip-map cache size of {} MB is too large",
                self.mipmap_cache.max_size_mb
            )));
        }
        FinishStyle::Round {
            radius_pt: self.corner_radius_pt,
        }
        .validate()?;
        self.finish_style()?;
        self.render_target()?;
        Ok(())
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(s: &str) -> SettingsResult<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a TOML string.
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load and validate settings from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), finish = %settings.finish, "loaded finish settings");
        Ok(settings)
    }

    /// Save settings to a TOML file.
    ///
    /// The file is written to a temporary file in the same directory and
    /// then renamed over the target, so readers never see a partial file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| SettingsError::Io(e.error))?;

        debug!(path = %path.display(), "saved finish settings");
        Ok(())
    }

    /// The per-user settings file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "Horizon Analytic Studios", "Horizon Finish")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Load the per-user settings, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default() -> SettingsResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_toml(path),
            _ => Ok(Self::default()),
        }
    }
}
