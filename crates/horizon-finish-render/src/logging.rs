//! Logging targets and span names for Horizon Finish.
//!
//! Horizon Finish uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_finish_render::mipmap=debug")
//!         .init();
//! }
//! ```
//!
//! Every event emitted by this crate uses one of the [`targets`] below, so
//! the mip-map cache can be traced without the much chattier synthesis
//! path (and vice versa).

/// Span names used throughout Horizon Finish for tracing.
pub mod span_names {
    /// A full bleed synthesis call.
    pub const SYNTHESIZE: &str = "horizon_finish::synthesize";
    /// Mirror tiling of a single layer.
    pub const MIRROR: &str = "horizon_finish::mirror";
    /// Building one mip-map chain.
    pub const MIPMAP_BUILD: &str = "horizon_finish::mipmap_build";
}

/// Target names for log filtering.
pub mod targets {
    /// Border classification outcomes.
    pub const CLASSIFY: &str = "horizon_finish_render::classify";
    /// Bleed synthesis path selection.
    pub const SYNTH: &str = "horizon_finish_render::synth";
    /// Mirror tiling.
    pub const MIRROR: &str = "horizon_finish_render::mirror";
    /// Mip-map cache builds, hits and evictions.
    pub const MIPMAP: &str = "horizon_finish_render::mipmap";
    /// Finish style dispatch.
    pub const FINISH: &str = "horizon_finish_render::finish";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time the expensive operations (synthesis, tiling, chain builds).
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span for one of the [`span_names`].
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_finish::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span_without_subscriber() {
        let _guard = PerfSpan::new(span_names::SYNTHESIZE);
    }

    #[test]
    fn test_targets_are_crate_scoped() {
        for target in [
            targets::CLASSIFY,
            targets::SYNTH,
            targets::MIRROR,
            targets::MIPMAP,
            targets::FINISH,
        ] {
            assert!(target.starts_with("horizon_finish_render::"));
        }
    }
}
