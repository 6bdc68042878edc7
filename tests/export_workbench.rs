//! End-to-end exports through the workbench and the reference renderer

use std::sync::Arc;
use std::time::Duration;

use pagesnap::assets::AssetLoader;
use pagesnap::rendering::ReferenceRenderer;
use pagesnap::{
    Artifact, Error, ExportConfig, ExportFormat, MarkupChanged, PreviewOutcome, RenderHost, Warning,
    Workbench,
};

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

fn bench() -> Workbench<ReferenceRenderer> {
    Workbench::new(ReferenceRenderer::new(), ExportConfig::default()).expect("default config")
}

async fn loaded(markup: &str) -> Workbench<ReferenceRenderer> {
    let bench = bench();
    let outcome = bench.on_markup_changed(MarkupChanged::new(markup)).await;
    assert!(matches!(outcome, PreviewOutcome::Updated), "{:?}", outcome);
    bench
}

fn html(artifact: &Artifact) -> &str {
    match artifact {
        Artifact::StaticHtml(html) => html,
        other => panic!("expected static HTML, got {:?}", other.format()),
    }
}

#[tokio::test]
async fn exports_only_marked_subtree() {
    let bench = loaded(SAMPLE).await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    let html = html(&report.artifact);

    assert!(html.contains("这个 div 将被导出"));
    assert!(html.contains("因为它有 export-this 类名"));
    assert!(!html.contains("不会被导出"));
    assert!(!html.contains("Hello World"));
    assert!(html.starts_with("<div style=\"background: #ffffff;"));
    assert!(!report
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::NoMatch { .. })));
}

#[tokio::test]
async fn changing_the_marker_changes_the_selection() {
    let bench = loaded(SAMPLE).await;
    bench.set_marker("dont-export").await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    let html = html(&report.artifact);
    assert!(html.contains("不会被导出"));
    assert!(!html.contains("将被导出"));
}

#[tokio::test]
async fn missing_marker_exports_everything_with_warning() {
    let bench = loaded("<section><h1>Title</h1><p>Body</p></section>").await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    let html = html(&report.artifact);
    assert!(html.contains("Title"));
    assert!(html.contains("Body"));
    assert!(report.warnings.contains(&Warning::NoMatch {
        marker: "export-this".into()
    }));
    assert!(!html.contains("pagesnap-preview"), "{}", html);
    assert!(html.contains("<section"));
}

#[tokio::test]
async fn gradient_backgrounds_survive_export() {
    let bench = loaded(
        r#"<div class="export-this" style="height: 40px; background: linear-gradient(to right, #ff0000, #0000ff)">x</div>"#,
    )
    .await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    let html = html(&report.artifact);
    assert!(html.contains("linear-gradient("), "{}", html);
    assert!(!html.contains("background-color: rgba(0, 0, 0, 0)"));
}

#[tokio::test]
async fn rejected_declaration_is_reported_and_skipped() {
    let bench =
        loaded(r#"<p class="export-this" style="color: notacolor; margin-top: 4px">x</p>"#).await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    assert!(report.warnings.contains(&Warning::StylePropertyRejected {
        property: "color".into(),
        value: "notacolor".into(),
    }));
    let html = html(&report.artifact);
    assert!(!html.contains("notacolor"));
    assert!(html.contains("margin-top: 4px"));
}

#[tokio::test]
async fn failed_component_keeps_previous_preview() {
    let bench = loaded(r#"<div class="export-this">first</div>"#).await;
    let broken = "<template><p>{{ nope }}</p></template><script>{}</script>";
    let outcome = bench.on_markup_changed(MarkupChanged::new(broken)).await;
    assert!(matches!(
        outcome,
        PreviewOutcome::Retained {
            error: Error::ComponentEvaluation(_)
        }
    ));
    assert_eq!(bench.source().await, r#"<div class="export-this">first</div>"#);

    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    assert!(html(&report.artifact).contains("first"));
}

#[tokio::test]
async fn component_markup_is_rendered_before_export() {
    let bench = loaded(
        r#"<template><div class="export-this"><h1>{{ title }}</h1></div></template>
<script>{ "data": { "title": "Quarterly" } }</script>"#,
    )
    .await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    assert!(html(&report.artifact).contains("Quarterly"));
}

#[tokio::test]
async fn empty_markup_is_ignored() {
    let bench = loaded(r#"<div class="export-this">kept</div>"#).await;
    let outcome = bench.on_markup_changed(MarkupChanged::new("  \n ")).await;
    assert!(matches!(outcome, PreviewOutcome::Ignored));
    assert!(bench.source().await.contains("kept"));
}

#[tokio::test]
async fn tall_content_spans_two_pdf_pages() {
    let bench = loaded(r#"<div class="export-this" style="height: 1500px; background: #eeeeee"></div>"#).await;
    let report = bench.export(ExportFormat::Pdf).await.expect("export");
    let Artifact::Pdf { bytes, pages } = &report.artifact else {
        panic!("expected a PDF");
    };
    assert_eq!(*pages, 2);
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.windows(8).any(|w| w == b"/Count 2"));
}

#[tokio::test]
async fn short_content_is_a_single_page() {
    let bench = loaded(SAMPLE).await;
    let report = bench.export(ExportFormat::Pdf).await.expect("export");
    assert!(matches!(report.artifact, Artifact::Pdf { pages: 1, .. }));
}

#[tokio::test]
async fn image_and_svg_exports() {
    let bench = loaded(SAMPLE).await;

    let report = bench.export(ExportFormat::Image).await.expect("png export");
    let Artifact::Image(shot) = &report.artifact else {
        panic!("expected an image");
    };
    assert_eq!(&shot.png_data[1..4], b"PNG");
    // 1200px of content plus 20px padding each side, at 2x
    assert_eq!(shot.width, 2480);
    assert!(shot.height > 0);

    let report = bench.export(ExportFormat::Svg).await.expect("svg export");
    let Artifact::Svg(svg) = &report.artifact else {
        panic!("expected an SVG");
    };
    assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1240\""));
    assert!(svg.contains("data:image/png;base64,"));
}

#[tokio::test]
async fn scratch_container_is_released_after_export() {
    let bench = loaded(SAMPLE).await;
    let before = bench.with_host(|h| h.document().children(h.document().body()).len()).await;
    bench.export(ExportFormat::Pdf).await.expect("export");
    let after = bench.with_host(|h| h.document().children(h.document().body()).len()).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn scratch_container_is_released_after_failed_export() {
    let host = ReferenceRenderer::new().with_max_canvas_height(10);
    let bench = Workbench::new(host, ExportConfig::default()).expect("default config");
    bench.on_markup_changed(MarkupChanged::new(SAMPLE)).await;
    let before = bench.with_host(|h| h.document().children(h.document().body()).len()).await;

    let result = bench.export(ExportFormat::Pdf).await;
    assert!(matches!(result, Err(Error::Rasterization(_))), "{:?}", result.err());

    let after = bench.with_host(|h| h.document().children(h.document().body()).len()).await;
    assert_eq!(before, after);
    assert!(!bench.is_busy());
}

#[tokio::test]
async fn important_author_rule_beats_inline_style_in_export() {
    let bench = loaded(
        r#"<style>.x { color: #0000ff !important; }</style>
<p class="export-this x" style="color: #ff0000">x</p>"#,
    )
    .await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    let html = html(&report.artifact);
    assert!(html.contains("color: rgb(0, 0, 255)"), "{}", html);
    assert!(!html.contains("#ff0000"));
}

/// Loader that takes a while for every asset
struct SlowLoader;

impl AssetLoader for SlowLoader {
    fn load(&self, _url: &str) -> pagesnap::Result<Vec<u8>> {
        std::thread::sleep(Duration::from_millis(400));
        Ok(b".late { color: #00ff00 }".to_vec())
    }
}

#[tokio::test]
async fn second_export_while_busy_is_refused() {
    let bench = bench().with_asset_loader(Arc::new(SlowLoader));
    bench
        .on_markup_changed(MarkupChanged::new(
            r#"<link rel="stylesheet" href="late.css"><p class="export-this late">x</p>"#,
        ))
        .await;

    let (first, second) = tokio::join!(bench.export(ExportFormat::StaticHtml), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        bench.export(ExportFormat::StaticHtml).await
    });

    let first = first.expect("first export");
    assert!(matches!(second, Err(Error::Busy)));
    assert!(!bench.is_busy());
    // the export waited for the stylesheet
    assert!(html(&first.artifact).contains("color: rgb(0, 255, 0)"));
}

#[tokio::test]
async fn failed_asset_is_a_warning() {
    let loader = pagesnap::assets::StaticAssetLoader::new();
    let bench = bench().with_asset_loader(Arc::new(loader));
    bench
        .on_markup_changed(MarkupChanged::new(
            r#"<link rel="stylesheet" href="missing.css"><p class="export-this">x</p>"#,
        ))
        .await;
    let report = bench.export(ExportFormat::StaticHtml).await.expect("export");
    assert!(report.warnings.contains(&Warning::AssetLoad {
        url: "missing.css".into(),
        reason: "not found".into(),
    }));
}

/// Serves `slow.css` late and anything else at once
struct PerUrlLoader;

impl AssetLoader for PerUrlLoader {
    fn load(&self, url: &str) -> pagesnap::Result<Vec<u8>> {
        if url.ends_with("slow.css") {
            std::thread::sleep(Duration::from_millis(300));
            Ok(b".p { color: #00ff00 }".to_vec())
        } else {
            Ok(b".p { color: #0000ff }".to_vec())
        }
    }
}

#[tokio::test]
async fn markup_change_during_export_waits_for_it() {
    let bench = bench().with_asset_loader(Arc::new(PerUrlLoader));
    bench
        .on_markup_changed(MarkupChanged::new(
            r#"<link rel="stylesheet" href="slow.css"><p class="export-this p">first</p>"#,
        ))
        .await;

    let (first, outcome) = tokio::join!(bench.export(ExportFormat::StaticHtml), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        bench
            .on_markup_changed(MarkupChanged::new(
                r#"<link rel="stylesheet" href="fast.css"><p class="export-this p">second</p>"#,
            ))
            .await
    });
    assert!(matches!(outcome, PreviewOutcome::Updated));

    let first = first.expect("first export");
    let html_first = html(&first.artifact);
    assert!(html_first.contains("first"));
    assert!(html_first.contains("color: rgb(0, 255, 0)"), "{}", html_first);

    let second = bench.export(ExportFormat::StaticHtml).await.expect("second export");
    let html_second = html(&second.artifact);
    assert!(html_second.contains("second"));
    assert!(html_second.contains("color: rgb(0, 0, 255)"), "{}", html_second);
}
