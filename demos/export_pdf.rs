//! Export a markup file to PDF, PNG and standalone HTML
//!
//! cargo run --example export_pdf -- page.html [marker]

use anyhow::Context;
use pagesnap::rendering::ReferenceRenderer;
use pagesnap::{ExportConfig, ExportFormat, MarkupChanged, PreviewOutcome, Workbench};

const SAMPLE: &str = r#"<div style="background: #f0f0f0; padding: 20px;">
  <h1>Hello World</h1>
  <p>Edit this HTML code!</p>
  <div class="export-this">
    <h2>这个 div 将被导出</h2>
    <p>因为它有 export-this 类名</p>
  </div>
  <div class="dont-export">
    <p>这个 div 不会被导出</p>
  </div>
</div>"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let markup = match args.next() {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?,
        None => {
            println!("No input file given; exporting the built-in sample\n");
            SAMPLE.to_string()
        }
    };

    let bench = Workbench::new(ReferenceRenderer::new(), ExportConfig::default())?;
    if let Some(marker) = args.next() {
        bench.set_marker(marker).await;
    }
    if let PreviewOutcome::Retained { error } =
        bench.on_markup_changed(MarkupChanged::new(markup)).await
    {
        anyhow::bail!("markup could not be previewed: {}", error);
    }

    for format in [ExportFormat::Pdf, ExportFormat::Image, ExportFormat::StaticHtml] {
        let report = bench.export(format).await?;
        let path = format!("export.{}", format.extension());
        std::fs::write(&path, report.artifact.as_bytes())
            .with_context(|| format!("writing {}", path))?;
        println!("Wrote {} ({} bytes)", path, report.artifact.as_bytes().len());
        for warning in &report.warnings {
            eprintln!("  warning: {}", warning);
        }
    }
    Ok(())
}
