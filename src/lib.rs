//! pagesnap
//!
//! Turns a live, styled markup fragment into portable static artifacts:
//! standalone HTML with every style inlined, paged PDF, PNG and SVG.
//!
//! # Pipeline
//!
//! - **Style resolution**: each element's computed style, restricted to an
//!   allow-list, is merged with its inline declarations
//!   ([`style::StyleResolver`])
//! - **Snapshot**: a detached clone carrying resolved styles
//!   ([`snapshot::SnapshotBuilder`])
//! - **Selection**: export roots picked by class marker ([`select::select_roots`])
//! - **Pagination**: the clone is rendered at a fixed width and cut into pages
//!   ([`paginate::paginate`])
//!
//! Layout and painting go through the [`RenderHost`] trait. The `reference`
//! feature (on by default) provides [`rendering::ReferenceRenderer`], a small
//! software renderer.
//!
//! # Example
//!
//! ```no_run
//! use pagesnap::{ExportConfig, ExportFormat, MarkupChanged, Workbench};
//! use pagesnap::rendering::ReferenceRenderer;
//!
//! # async fn run() -> pagesnap::Result<()> {
//! let bench = Workbench::new(ReferenceRenderer::new(), ExportConfig::default())?;
//! bench
//!     .on_markup_changed(MarkupChanged::new(
//!         r#"<div class="export-this"><h1>Report</h1></div>"#,
//!     ))
//!     .await;
//! let report = bench.export(ExportFormat::Pdf).await?;
//! std::fs::write("report.pdf", report.artifact.as_bytes()).ok();
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod assets;
pub mod component;
pub mod dom;
pub mod error;
pub mod host;
pub mod node;
pub mod output;
pub mod paginate;
pub mod raster;
pub mod scratch;
pub mod select;
pub mod snapshot;
pub mod style;
pub mod workbench;

// Reference renderer: cascade, block layout and software raster
#[cfg(feature = "reference")]
pub mod rendering;

pub use component::{BindingEvaluator, ComponentEvaluator, DialectPolicy};
pub use dom::{LiveDocument, NodeId};
pub use error::{Error, Result, Warning};
pub use host::{PropertyMap, Rect, RenderHost};
pub use node::{Element, Node, PseudoPosition};
pub use output::{Artifact, ExportFormat, HtmlOptions, PageImageEncoding, SvgBody, SvgOptions};
pub use paginate::{PageLayout, PagedDocument, Unit};
pub use raster::PixelBuffer;
pub use scratch::ScratchStyle;
pub use snapshot::PositioningMode;
pub use style::{AllowList, StyleMap, StyleProfile};
pub use workbench::{ExportReport, MarkupChanged, PreviewOutcome, Workbench};

/// Page frame size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width: f64,
    pub height: f64,
    pub unit: Unit,
}

impl Default for PageSetup {
    /// A4 portrait
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            unit: Unit::Millimeter,
        }
    }
}

/// Export configuration
///
/// Defaults reproduce the classic export: A4 pages from an 800px wide
/// layout, full-quality JPEG page images, 1200px wide PNG/SVG renders, a
/// white 20px-padded scratch container and the full property allow-list.
///
/// # Examples
///
/// ```
/// let cfg = pagesnap::ExportConfig::default();
/// assert_eq!(cfg.virtual_width_px, 800);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Paged output frame
    pub page: PageSetup,
    /// CSS width paged content is laid out at
    pub virtual_width_px: u32,
    /// CSS width PNG and SVG content is laid out at
    pub image_width_px: u32,
    /// Downscale PNG output to at most this many pixels wide; 0 keeps the
    /// render scale
    pub image_max_pixel_width: u32,
    /// Embedding of PDF page images
    pub page_image: PageImageEncoding,
    /// Container the snapshot is rendered in
    pub scratch: ScratchStyle,
    /// Which allow-list profile snapshots copy
    pub style_profile: StyleProfile,
    /// Positioning when the whole document is exported
    pub document_positioning: PositioningMode,
    /// Positioning when marker-selected roots are exported
    pub marker_positioning: PositioningMode,
    /// Drop `class` attributes from snapshots
    pub strip_class_attributes: bool,
    /// Selection marker a new workbench starts with
    pub default_marker: String,
    /// Static HTML formatting
    pub html: HtmlOptions,
    pub svg: SvgOptions,
    /// How incoming markup is interpreted
    pub dialect: DialectPolicy,
    /// Base URL relative asset references resolve against
    pub base_url: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page: PageSetup::default(),
            virtual_width_px: 800,
            image_width_px: 1200,
            image_max_pixel_width: 0,
            page_image: PageImageEncoding::default(),
            scratch: ScratchStyle::default(),
            style_profile: StyleProfile::Full,
            document_positioning: PositioningMode::Flow,
            marker_positioning: PositioningMode::Flow,
            strip_class_attributes: false,
            default_marker: "export-this".to_string(),
            html: HtmlOptions::default(),
            svg: SvgOptions::default(),
            dialect: DialectPolicy::Auto,
            base_url: None,
        }
    }
}

impl ExportConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.page_layout().validate()?;
        if self.image_width_px == 0 {
            return Err(Error::ConfigError("image width must be non-zero".into()));
        }
        if let PageImageEncoding::Jpeg { quality } = self.page_image {
            if !(1..=100).contains(&quality) {
                return Err(Error::ConfigError(format!(
                    "JPEG quality must be within 1..=100, got {}",
                    quality
                )));
            }
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base)
                .map_err(|e| Error::ConfigError(format!("invalid base URL '{}': {}", base, e)))?;
        }
        Ok(())
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout {
            width_units: self.page.width,
            height_units: self.page.height,
            unit: self.page.unit,
            virtual_width_px: self.virtual_width_px,
        }
    }

    pub fn base_url(&self) -> Option<url::Url> {
        self.base_url.as_deref().and_then(|b| url::Url::parse(b).ok())
    }
}

/// Viewport dimensions the preview is laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_export() {
        let cfg = ExportConfig::default();
        let layout = cfg.page_layout();
        assert_eq!((layout.width_units, layout.height_units), (210.0, 297.0));
        assert_eq!(cfg.scratch.padding_px, 20);
        assert_eq!(cfg.page_image, PageImageEncoding::Jpeg { quality: 100 });
        assert_eq!(cfg.default_marker, "export-this");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = ExportConfig {
            virtual_width_px: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));

        let cfg = ExportConfig {
            page_image: PageImageEncoding::Jpeg { quality: 0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ExportConfig {
            base_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_overrides_selected_fields() {
        let cfg = ExportConfig::from_json(
            r#"{ "page": { "width": 8.5, "height": 11, "unit": "inch" },
                 "page_image": { "kind": "flate" },
                 "marker_positioning": "explicit" }"#,
        )
        .unwrap();
        assert_eq!(cfg.page.unit, Unit::Inch);
        assert_eq!(cfg.page_image, PageImageEncoding::Flate);
        assert_eq!(cfg.marker_positioning, PositioningMode::Explicit);
        assert_eq!(cfg.virtual_width_px, 800);
        assert!(ExportConfig::from_json("{ \"virtual_width_px\": \"wide\" }").is_err());
    }
}
