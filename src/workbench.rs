//! Preview/export session.
//!
//! A [`Workbench`] owns the render host and the current preview. Markup
//! changes replace the preview; a failed refresh keeps the previous one.
//! Exports are serialized by a one-permit gate: starting an export while
//! another is in flight fails with [`Error::Busy`].

use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::{Mutex, Semaphore};

use crate::assets::{discover_assets, AssetBarrier, AssetLoader};
use crate::component::{render_component, BindingEvaluator, ComponentEvaluator, Dialect};
use crate::dom::LiveDocument;
use crate::error::{Error, Result, Warning};
use crate::host::RenderHost;
use crate::output::{
    encode_png, render_static_html, wrap_roots, write_pdf, write_svg, Artifact, ExportFormat,
};
use crate::paginate::{paginate, rasterize_tree};
use crate::node::Node;
use crate::select::{select_roots, RootOrigin};
use crate::snapshot::{SnapshotBuilder, SnapshotOptions};
use crate::style::AllowList;
use crate::ExportConfig;

/// The editable source changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupChanged {
    pub markup: String,
}

impl MarkupChanged {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

#[derive(Debug)]
pub enum PreviewOutcome {
    /// The preview now shows the new markup
    Updated,
    /// The markup could not be turned into a preview; the old one stays
    Retained { error: Error },
    /// Empty markup; nothing happened
    Ignored,
}

#[derive(Debug)]
pub struct ExportReport {
    pub artifact: Artifact,
    pub warnings: Vec<Warning>,
}

struct Session<H> {
    host: H,
    source: String,
    marker: String,
}

pub struct Workbench<H: RenderHost> {
    config: ExportConfig,
    allow_list: AllowList,
    session: Mutex<Session<H>>,
    gate: Semaphore,
    evaluator: Box<dyn ComponentEvaluator>,
    loader: Option<Arc<dyn AssetLoader>>,
    assets: AssetBarrier,
}

impl<H: RenderHost> Workbench<H> {
    pub fn new(host: H, config: ExportConfig) -> Result<Self> {
        config.validate()?;
        let marker = config.default_marker.clone();
        Ok(Self {
            allow_list: AllowList::for_profile(config.style_profile),
            config,
            session: Mutex::new(Session {
                host,
                source: String::new(),
                marker,
            }),
            gate: Semaphore::new(1),
            evaluator: Box::new(BindingEvaluator),
            loader: None,
            assets: AssetBarrier::new(),
        })
    }

    pub fn with_evaluator(mut self, evaluator: impl ComponentEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Fetch fonts, icons and linked stylesheets with `loader` on every
    /// markup change
    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Source markup of the current preview
    pub async fn source(&self) -> String {
        self.session.lock().await.source.clone()
    }

    pub async fn marker(&self) -> String {
        self.session.lock().await.marker.clone()
    }

    pub async fn set_marker(&self, marker: impl Into<String>) {
        let marker = marker.into();
        debug!("Selection marker set to '{}'", marker);
        self.session.lock().await.marker = marker;
    }

    /// Run `f` against the render host
    pub async fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        let session = self.session.lock().await;
        f(&session.host)
    }

    /// Rebuild the preview from new source markup
    pub async fn on_markup_changed(&self, event: MarkupChanged) -> PreviewOutcome {
        if event.markup.trim().is_empty() {
            debug!("Ignoring empty markup");
            return PreviewOutcome::Ignored;
        }
        let markup = match self.config.dialect.dialect_for(&event.markup) {
            Dialect::Plain => event.markup.clone(),
            Dialect::Component => match render_component(&event.markup, self.evaluator.as_ref()) {
                Ok(markup) => markup,
                Err(err) => {
                    error!("Preview not updated: {}", err);
                    return PreviewOutcome::Retained { error: err };
                }
            },
        };

        let document = LiveDocument::parse_fragment(&markup);
        let referenced = discover_assets(&document, self.config.base_url().as_ref());
        let mut session = self.session.lock().await;
        session.host.load_document(document);
        session.source = event.markup;
        if let Some(loader) = &self.loader {
            self.assets.prime(Arc::clone(loader), referenced);
        }
        info!("Preview updated ({} bytes of markup)", markup.len());
        PreviewOutcome::Updated
    }

    /// Export the current preview
    pub async fn export(&self, format: ExportFormat) -> Result<ExportReport> {
        let _permit = self.gate.try_acquire().map_err(|_| Error::Busy)?;
        match self.run_export(format).await {
            Ok(report) => {
                info!(
                    "Exported {} ({} bytes, {} warning(s))",
                    format.extension(),
                    report.artifact.as_bytes().len(),
                    report.warnings.len()
                );
                Ok(report)
            }
            Err(err) => {
                error!("Export to {} failed: {}", format.extension(), err);
                Err(err)
            }
        }
    }

    async fn run_export(&self, format: ExportFormat) -> Result<ExportReport> {
        // No markup change can prime a new batch while the session is held
        let mut guard = self.session.lock().await;
        self.assets.wait_ready().await;
        let session = &mut *guard;
        for (href, bytes) in self.assets.drain_loaded() {
            session.host.register_asset(&href, &bytes);
        }
        let mut warnings = self.assets.warnings();

        let selection = select_roots(session.host.document(), &session.marker);
        warnings.extend(selection.warnings.iter().cloned());
        let options = SnapshotOptions {
            positioning: if selection.is_fallback() {
                self.config.document_positioning
            } else {
                self.config.marker_positioning
            },
            strip_class_attributes: self.config.strip_class_attributes,
        };

        let mut roots = Vec::with_capacity(selection.roots.len());
        let mut builder = SnapshotBuilder::new(&session.host, &self.allow_list, options);
        for root in &selection.roots {
            match (&root.origin, builder.snapshot(root.element)?) {
                // the preview container itself is ours, not the author's
                (RootOrigin::WholeDocument, Node::Element(container)) => {
                    roots.extend(container.children)
                }
                (_, node) => roots.push(node),
            }
        }
        warnings.extend(builder.into_warnings());
        let tree = wrap_roots(roots);

        let config = &self.config;
        let artifact = match format {
            ExportFormat::StaticHtml => {
                Artifact::StaticHtml(render_static_html(&tree, &config.html))
            }
            ExportFormat::Pdf => {
                let paged =
                    paginate(&mut session.host, &tree, &config.page_layout(), &config.scratch)
                        .await?;
                Artifact::Pdf {
                    bytes: write_pdf(&paged, config.page_image)?,
                    pages: paged.len(),
                }
            }
            ExportFormat::Image => {
                let buffer = rasterize_tree(
                    &mut session.host,
                    &tree,
                    config.image_width_px,
                    &config.scratch,
                )
                .await?;
                Artifact::Image(encode_png(&buffer, config.image_max_pixel_width)?)
            }
            ExportFormat::Svg => {
                let buffer = rasterize_tree(
                    &mut session.host,
                    &tree,
                    config.image_width_px,
                    &config.scratch,
                )
                .await?;
                Artifact::Svg(write_svg(
                    &tree,
                    &buffer,
                    config.scratch.outer_width(config.image_width_px),
                    config.svg.body,
                )?)
            }
        };
        Ok(ExportReport { artifact, warnings })
    }
}
