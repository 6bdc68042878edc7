//! Fonts, icons and linked stylesheets the preview depends on.
//!
//! Assets are discovered when the markup changes and fetched in the
//! background. Exports wait on [`AssetBarrier::wait_ready`] so text is not
//! rasterized with a fallback face while a font is still in flight. There is
//! no timeout on that wait.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use cssparser::{ParseError, Parser, ParserInput, Token};
use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::watch;
use url::Url;

use crate::dom::LiveDocument;
use crate::error::{Error, Result, Warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Stylesheet,
    Font,
    Icon,
}

/// A referenced asset; `href` is the text as written, `url` the resolved
/// location handed to the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub href: String,
    pub url: String,
    pub kind: AssetKind,
}

/// Fetches asset bytes; called from a blocking worker thread
pub trait AssetLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<Vec<u8>>;
}

/// Serves assets from memory
#[derive(Debug, Clone, Default)]
pub struct StaticAssetLoader {
    assets: BTreeMap<String, Vec<u8>>,
}

impl StaticAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(url.into(), bytes.into());
        self
    }
}

impl AssetLoader for StaticAssetLoader {
    fn load(&self, url: &str) -> Result<Vec<u8>> {
        self.assets.get(url).cloned().ok_or_else(|| Error::Asset {
            url: url.to_string(),
            reason: "not found".into(),
        })
    }
}

#[cfg(feature = "http-assets")]
pub use http::HttpAssetLoader;

#[cfg(feature = "http-assets")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;

    use super::AssetLoader;
    use crate::error::{Error, Result};

    /// Fetches assets over HTTP(S) with a blocking `reqwest` client
    pub struct HttpAssetLoader {
        client: Client,
    }

    impl HttpAssetLoader {
        pub fn new(timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client })
        }
    }

    impl AssetLoader for HttpAssetLoader {
        fn load(&self, url: &str) -> Result<Vec<u8>> {
            let asset_err = |reason: String| Error::Asset {
                url: url.to_string(),
                reason,
            };
            let resp = self
                .client
                .get(url)
                .send()
                .map_err(|e| asset_err(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(asset_err(format!("HTTP {}", resp.status())));
            }
            resp.bytes()
                .map(|b| b.to_vec())
                .map_err(|e| asset_err(e.to_string()))
        }
    }
}

fn resolve(href: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

/// Linked stylesheets, icons, preloaded fonts and `@font-face`/`@import`
/// URLs in document order, without duplicates
pub fn discover_assets(doc: &LiveDocument, base: Option<&Url>) -> Vec<AssetRef> {
    let mut found: Vec<(String, AssetKind)> = Vec::new();
    for id in doc.descendants(doc.body()) {
        let Some(el) = doc.element(id) else {
            continue;
        };
        match el.tag.as_str() {
            "link" => {
                let Some(href) = el.attr("href") else {
                    continue;
                };
                let rel = el.attr("rel").unwrap_or("").to_ascii_lowercase();
                let rels: Vec<&str> = rel.split_whitespace().collect();
                let kind = if rels.contains(&"stylesheet") {
                    Some(AssetKind::Stylesheet)
                } else if rels.contains(&"icon") {
                    Some(AssetKind::Icon)
                } else if rels.contains(&"preload")
                    && el.attr("as").is_some_and(|a| a.eq_ignore_ascii_case("font"))
                {
                    Some(AssetKind::Font)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    found.push((href.to_string(), kind));
                }
            }
            "style" => scan_css(&doc.text_content(id), &mut found),
            _ => {}
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    found
        .into_iter()
        .filter(|(href, _)| !href.trim().is_empty() && !href.starts_with("data:"))
        .filter(|(href, _)| seen.insert(href.clone()))
        .map(|(href, kind)| AssetRef {
            url: resolve(&href, base),
            href,
            kind,
        })
        .collect()
}

fn scan_css(css: &str, out: &mut Vec<(String, AssetKind)>) {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    scan_tokens(&mut parser, None, out);
}

fn scan_tokens(parser: &mut Parser<'_, '_>, context: Option<AssetKind>, out: &mut Vec<(String, AssetKind)>) {
    let mut pending: Option<AssetKind> = None;
    let mut font_face = false;
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let kind = pending.or(context);
        match token {
            Token::AtKeyword(ref name) if name.eq_ignore_ascii_case("import") => {
                pending = Some(AssetKind::Stylesheet);
            }
            Token::AtKeyword(ref name) if name.eq_ignore_ascii_case("font-face") => {
                font_face = true;
            }
            Token::UnquotedUrl(ref u) => {
                if let Some(kind) = kind {
                    out.push((u.to_string(), kind));
                }
            }
            Token::QuotedString(ref s) if pending == Some(AssetKind::Stylesheet) => {
                out.push((s.to_string(), AssetKind::Stylesheet));
                pending = None;
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                if let Ok(u) = parser.parse_nested_block(|nested| url_argument(nested)) {
                    if let Some(kind) = kind {
                        out.push((u, kind));
                    }
                }
            }
            Token::CurlyBracketBlock => {
                let inner = if font_face { Some(AssetKind::Font) } else { None };
                let _ = parser.parse_nested_block(|nested| scan_block(nested, inner, out));
                font_face = false;
                pending = None;
            }
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
                let _ = parser.parse_nested_block(|nested| scan_block(nested, kind, out));
            }
            Token::Semicolon => pending = None,
            _ => {}
        }
    }
}

fn scan_block<'i>(
    input: &mut Parser<'i, '_>,
    context: Option<AssetKind>,
    out: &mut Vec<(String, AssetKind)>,
) -> std::result::Result<(), ParseError<'i, ()>> {
    scan_tokens(input, context, out);
    Ok(())
}

fn url_argument<'i>(input: &mut Parser<'i, '_>) -> std::result::Result<String, ParseError<'i, ()>> {
    Ok(input.expect_string()?.to_string())
}

#[derive(Debug, Default)]
struct BarrierState {
    generation: u64,
    loaded: Vec<(String, Vec<u8>)>,
    warnings: Vec<Warning>,
}

/// Readiness flag for the current document's assets
#[derive(Clone)]
pub struct AssetBarrier {
    ready: Arc<watch::Sender<bool>>,
    state: Arc<Mutex<BarrierState>>,
}

impl Default for AssetBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetBarrier {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(true);
        Self {
            ready: Arc::new(ready),
            state: Arc::new(Mutex::new(BarrierState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Start fetching `assets`, superseding any earlier batch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn prime(&self, loader: Arc<dyn AssetLoader>, assets: Vec<AssetRef>) {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.loaded.clear();
            state.warnings.clear();
            state.generation
        };
        if assets.is_empty() {
            self.ready.send_replace(true);
            return;
        }
        self.ready.send_replace(false);
        debug!("Fetching {} asset(s)", assets.len());

        let ready = Arc::clone(&self.ready);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let fetches = assets.iter().cloned().map(|asset| {
                let loader = Arc::clone(&loader);
                tokio::task::spawn_blocking(move || loader.load(&asset.url))
            });
            let results = join_all(fetches).await;

            let mut loaded = Vec::new();
            let mut warnings = Vec::new();
            for (asset, result) in assets.into_iter().zip(results) {
                let reason = match result {
                    Ok(Ok(bytes)) => {
                        debug!("Loaded asset {} ({} bytes)", asset.url, bytes.len());
                        loaded.push((asset.href, bytes));
                        continue;
                    }
                    Ok(Err(Error::Asset { reason, .. })) => reason,
                    Ok(Err(err)) => err.to_string(),
                    Err(join_err) => join_err.to_string(),
                };
                warn!("Asset {} unavailable: {}", asset.url, reason);
                warnings.push(Warning::AssetLoad {
                    url: asset.url,
                    reason,
                });
            }

            let mut guard = state.lock().unwrap_or_else(|p| p.into_inner());
            if guard.generation != generation {
                // a newer batch owns the flag
                return;
            }
            guard.loaded = loaded;
            guard.warnings = warnings;
            drop(guard);
            ready.send_replace(true);
        });
    }

    /// Resolves once the latest batch has settled
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Assets loaded since the last call, keyed by `href`
    pub fn drain_loaded(&self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.state().loaded)
    }

    /// Load failures of the current batch
    pub fn warnings(&self) -> Vec<Warning> {
        self.state().warnings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_links_and_font_faces() {
        let doc = LiveDocument::parse_fragment(
            r#"<link rel="stylesheet" href="theme.css"><link rel="icon" href="/favicon.ico">
<style>@import "print.css"; @font-face { font-family: X; src: url(fonts/x.woff2) format("woff2"), url("fonts/x.ttf"); }
.a { background: url(bg.png); }</style><p>x</p>"#,
        );
        let base = Url::parse("https://example.com/docs/").unwrap();
        let found = discover_assets(&doc, Some(&base));
        let pairs: Vec<_> = found.iter().map(|a| (a.href.as_str(), a.kind)).collect();
        assert_eq!(
            pairs,
            vec![
                ("theme.css", AssetKind::Stylesheet),
                ("/favicon.ico", AssetKind::Icon),
                ("print.css", AssetKind::Stylesheet),
                ("fonts/x.woff2", AssetKind::Font),
                ("fonts/x.ttf", AssetKind::Font),
            ]
        );
        assert_eq!(found[0].url, "https://example.com/docs/theme.css");
        assert_eq!(found[1].url, "https://example.com/favicon.ico");
    }

    #[tokio::test]
    async fn barrier_settles_with_warnings() {
        let barrier = AssetBarrier::new();
        let loader = Arc::new(StaticAssetLoader::new().with("a.woff", b"font".to_vec()));
        let assets = vec![
            AssetRef {
                href: "a.woff".into(),
                url: "a.woff".into(),
                kind: AssetKind::Font,
            },
            AssetRef {
                href: "b.woff".into(),
                url: "b.woff".into(),
                kind: AssetKind::Font,
            },
        ];
        barrier.prime(loader, assets);
        barrier.wait_ready().await;
        assert!(barrier.is_ready());
        assert_eq!(barrier.drain_loaded(), vec![("a.woff".to_string(), b"font".to_vec())]);
        assert!(barrier.drain_loaded().is_empty());
        assert_eq!(
            barrier.warnings(),
            vec![Warning::AssetLoad {
                url: "b.woff".into(),
                reason: "not found".into()
            }]
        );
    }

    #[tokio::test]
    async fn empty_batch_is_ready_immediately() {
        let barrier = AssetBarrier::new();
        barrier.prime(Arc::new(StaticAssetLoader::new()), Vec::new());
        assert!(barrier.is_ready());
        barrier.wait_ready().await;
    }
}
