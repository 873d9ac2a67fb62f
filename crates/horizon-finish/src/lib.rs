//! Horizon Finish - print finishing for rendered card faces.
//!
//! This is the main umbrella crate. It re-exports the finishing operations
//! from `horizon-finish-render` and adds TOML-backed [`FinishSettings`] and
//! the [`EdgeFinisher`] service, which applies those settings and owns a
//! mip-map cache.
//!
//! # Example
//!
//! ```no_run
//! use horizon_finish::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = FinishSettings::load_toml("finish.toml")?;
//!     let finisher = EdgeFinisher::new(settings)?;
//!
//!     let face = PixelBuffer::from_file("front.png")?;
//!     finisher.finish(&face, None)?.save("front-print.png")?;
//!     Ok(())
//! }
//! ```

mod finisher;
mod settings;

pub use horizon_finish_render::*;

pub use finisher::EdgeFinisher;
pub use settings::{
    FinishSettings, MipmapCacheSettings, SETTINGS_FILE_NAME, SettingsError, SettingsResult,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::finisher::EdgeFinisher;
    pub use crate::settings::{FinishSettings, SettingsError, SettingsResult};
    pub use horizon_finish_render::{
        Argb, BleedStrategy, BorderSynthesizer, FinishError, FinishResult, FinishStyle,
        MipmapCache, MipmapCacheConfig, PixelBuffer, RenderTarget, cut_corners, synthesize,
    };
}
