//! Configuration types for PAGE XML export.
//!
//! All export behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. Validation of the window parameters happens once
//! in [`ExportConfigBuilder::build`], so an exporter constructed from a valid
//! config never has to re-check them per window.

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which unit each output record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// One record per page: full image plus the verbatim XML source.
    Raw,
    /// One record per page: full image plus newline-joined region texts. (default)
    #[default]
    Text,
    /// One record per region: cropped region image plus region text.
    Region,
    /// One record per line: cropped line image plus line text.
    Line,
    /// One record per sliding window of consecutive lines within a region.
    Window,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportMode::Raw => "raw",
            ExportMode::Text => "text",
            ExportMode::Region => "region",
            ExportMode::Line => "line",
            ExportMode::Window => "window",
        };
        f.write_str(s)
    }
}

/// Configuration for one export run.
///
/// Built via [`ExportConfig::builder()`] or [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use pagexml2ds::{ExportConfig, ExportMode};
///
/// let config = ExportConfig::builder()
///     .mode(ExportMode::Window)
///     .window_size(3)
///     .overlap(1)
///     .mask(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export mode. Default: [`ExportMode::Text`].
    pub mode: ExportMode,

    /// PAGE XML namespace URI override. When `None`, the standard
    /// 2013-07-15 PAGE content namespace is used.
    pub namespace: Option<String>,

    /// Lines per window (window mode only). Default: 2.
    pub window_size: usize,

    /// Lines shared between consecutive windows (window mode only).
    /// Must be strictly less than `window_size`. Default: 0.
    pub overlap: usize,

    /// Mask crops to the exact polygon, painting everything outside uniform
    /// white. Without masking the crop is the axis-aligned bounding box.
    /// Default: false.
    pub mask: bool,

    /// Minimum crop width in pixels. Crops narrower than this are counted as
    /// skips. `None` disables the check. Default: `None`.
    pub min_width: Option<u32>,

    /// Emit regions/lines whose text annotation is absent or blank.
    /// Default: false.
    pub allow_empty: bool,

    /// Timeout for the remote image fallback, in seconds. A timeout or any
    /// request failure is treated as "no image found" for that page.
    /// Default: 20.
    pub fetch_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: ExportMode::default(),
            namespace: None,
            window_size: 2,
            overlap: 0,
            mask: false,
            min_width: None,
            allow_empty: false,
            fetch_timeout_secs: 20,
        }
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn mode(mut self, mode: ExportMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.config.namespace = Some(ns.into());
        self
    }

    pub fn window_size(mut self, n: usize) -> Self {
        self.config.window_size = n;
        self
    }

    pub fn overlap(mut self, n: usize) -> Self {
        self.config.overlap = n;
        self
    }

    pub fn mask(mut self, v: bool) -> Self {
        self.config.mask = v;
        self
    }

    pub fn min_width(mut self, px: u32) -> Self {
        self.config.min_width = Some(px);
        self
    }

    pub fn allow_empty(mut self, v: bool) -> Self {
        self.config.allow_empty = v;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Window constraints are enforced here (construction-level) rather than
    /// per window: `window_size >= 1` and `overlap < window_size`.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if c.window_size == 0 {
            return Err(ExportError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if c.overlap >= c.window_size {
            return Err(ExportError::InvalidWindowConfig {
                window_size: c.window_size,
                overlap: c.overlap,
            });
        }
        if c.min_width == Some(0) {
            return Err(ExportError::InvalidConfig(
                "minimum width must be a positive integer".into(),
            ));
        }
        Ok(self.config)
    }
}
