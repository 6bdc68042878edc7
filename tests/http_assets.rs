//! HTTP asset loading against a local server
#![cfg(feature = "http-assets")]

use std::sync::Arc;
use std::time::Duration;

use pagesnap::assets::HttpAssetLoader;
use pagesnap::rendering::ReferenceRenderer;
use pagesnap::{Artifact, ExportConfig, ExportFormat, MarkupChanged, Warning, Workbench};
use tiny_http::{Header, Response, Server};

fn start_test_server() -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let port = server
        .server_addr()
        .to_ip()
        .expect("tcp listener")
        .port();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            if request.url().ends_with("/theme.css") {
                let resp = Response::from_string(".brand { color: #ff0000; margin-top: 7px }")
                    .with_header("Content-Type: text/css".parse::<Header>().unwrap());
                let _ = request.respond(resp);
            } else {
                let _ = request.respond(Response::from_string("missing").with_status_code(404));
            }
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

#[test]
fn linked_stylesheet_is_fetched_before_export() {
    let base = start_test_server();
    let config = ExportConfig {
        base_url: Some(base.clone()),
        ..Default::default()
    };
    let loader = HttpAssetLoader::new(Duration::from_secs(5)).expect("http client");
    let bench = Workbench::new(ReferenceRenderer::new(), config)
        .expect("config")
        .with_asset_loader(Arc::new(loader));

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let report = rt.block_on(async {
        bench
            .on_markup_changed(MarkupChanged::new(
                r#"<link rel="stylesheet" href="theme.css"><link rel="icon" href="gone.ico">
<p class="export-this brand">styled</p>"#,
            ))
            .await;
        bench.export(ExportFormat::StaticHtml).await
    });
    let report = report.expect("export");

    let Artifact::StaticHtml(html) = &report.artifact else {
        panic!("expected static HTML");
    };
    assert!(html.contains("color: rgb(255, 0, 0)"), "{}", html);
    assert!(html.contains("margin-top: 7px"));
    assert_eq!(
        report.warnings,
        vec![Warning::AssetLoad {
            url: format!("{}gone.ico", base),
            reason: "HTTP 404 Not Found".into(),
        }]
    );
    drop(rt);
}
