//! Page printing: turn a web page into a PDF through a headless browser.
//!
//! The conversion tool sits behind [`PdfRenderer`] so the fetch job does not
//! care whether the PDF comes from Chrome, a remote print service, or a test
//! double. [`ChromeRenderer`] is the production implementation.
//!
//! ## How a page is printed
//!
//! [`ChromeRenderer`] drives Chromium over the DevTools protocol
//! (`chromiumoxide`), one browser per URL with a throwaway profile:
//!
//! ```text
//!  Page.navigate ──▶ load ──▶ network quiet ──▶ strip clutter ──▶ Page.printToPDF
//!                                                (iframe, script,    A4, 20 mm margins,
//!                                                 header, footer…)   backgrounds
//! ```
//!
//! A navigation error (DNS, connection refused, TLS) fails the item; Chrome's
//! own error page is never printed. The whole sequence runs under the per-URL
//! timeout, and the PDF reaches `dest` through a `.part` file and a rename.

use crate::config::JobConfig;
use crate::error::FetchError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{NavigateParams, PrintToPdfParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Elements removed from the page before printing.
pub const STRIPPED_SELECTORS: &str = "iframe, script, noscript, .header, .footer, .navbar";

/// Resolves once no new resource has been requested for `quiet_ms`.
const NETWORK_QUIET_JS: &str = r#"new Promise(resolve => {
    const quietMs = 500;
    let last = -1, quiet = 0;
    const tick = () => {
        const n = performance.getEntriesByType('resource').length;
        if (n === last) { quiet += 100; } else { quiet = 0; last = n; }
        if (quiet >= quietMs) { resolve(n); } else { setTimeout(tick, 100); }
    };
    tick();
})"#;

/// Why a render attempt produced no PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The tool ran but failed; detail is human-readable.
    Failed(String),
    /// The tool exceeded its time budget and was killed.
    TimedOut(u64),
}

/// A tool that prints `url` into a PDF at `dest`.
///
/// Implementations must leave no file at `dest` when they fail.
pub trait PdfRenderer: Send + Sync {
    fn render<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<(), RenderFailure>>;
}

// ── Print layout ─────────────────────────────────────────────────────────────

/// Paper and margin settings handed to `Page.printToPDF`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintLayout {
    /// Paper width in millimetres.
    pub paper_width_mm: f64,
    /// Paper height in millimetres.
    pub paper_height_mm: f64,
    /// Same margin on all four sides, in millimetres.
    pub margin_mm: f64,
    pub print_background: bool,
}

impl Default for PrintLayout {
    /// A4 with 20 mm margins and backgrounds.
    fn default() -> Self {
        Self {
            paper_width_mm: 210.0,
            paper_height_mm: 297.0,
            margin_mm: 20.0,
            print_background: true,
        }
    }
}

impl PrintLayout {
    /// DevTools parameters; the protocol measures paper in inches.
    pub fn to_params(&self) -> PrintToPdfParams {
        let margin = mm_to_inches(self.margin_mm);
        PrintToPdfParams {
            print_background: Some(self.print_background),
            paper_width: Some(mm_to_inches(self.paper_width_mm)),
            paper_height: Some(mm_to_inches(self.paper_height_mm)),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            display_header_footer: Some(false),
            ..Default::default()
        }
    }
}

fn mm_to_inches(mm: f64) -> f64 {
    mm / 25.4
}

/// Script that removes every element matching [`STRIPPED_SELECTORS`].
pub fn strip_script() -> String {
    format!("document.querySelectorAll('{STRIPPED_SELECTORS}').forEach(el => el.remove());")
}

// ── Chrome renderer ──────────────────────────────────────────────────────────

/// Headless Chromium/Chrome renderer driven over the DevTools protocol.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    browser: PathBuf,
    timeout_secs: u64,
    window_size: (u32, u32),
    layout: PrintLayout,
}

impl ChromeRenderer {
    pub fn new(browser: impl Into<PathBuf>, timeout_secs: u64, window_size: (u32, u32)) -> Self {
        Self {
            browser: browser.into(),
            timeout_secs,
            window_size,
            layout: PrintLayout::default(),
        }
    }

    /// Locate a browser (explicit `browser_path` first, then `browser-auto`).
    pub fn from_config(config: &JobConfig) -> Result<Self, FetchError> {
        let browser = match config.browser_path {
            Some(ref p) => browser_auto::browser_from_path(p),
            None => browser_auto::ensure_browser(),
        }
        .map_err(|e| FetchError::BrowserUnavailable(e.to_string()))?;

        debug!("Using browser at {}", browser.display());
        Ok(Self::new(
            browser,
            config.render_timeout_secs,
            config.window_size,
        ))
    }

    pub fn layout(&self) -> &PrintLayout {
        &self.layout
    }

    /// Launch settings for one print job.
    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, RenderFailure> {
        let (w, h) = self.window_size;
        BrowserConfig::builder()
            .chrome_executable(&self.browser)
            .user_data_dir(profile_dir)
            .window_size(w, h)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--no-first-run")
            .build()
            .map_err(|e| RenderFailure::Failed(format!("browser config: {e}")))
    }

    async fn run(&self, url: &str, dest: &Path) -> Result<(), RenderFailure> {
        let profile = tempfile::TempDir::new()
            .map_err(|e| RenderFailure::Failed(format!("profile dir: {e}")))?;
        let config = self.browser_config(profile.path())?;

        let printed = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.print_with_browser(config, url),
        )
        .await;

        let pdf = match printed {
            Ok(Ok(pdf)) => pdf,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(RenderFailure::TimedOut(self.timeout_secs)),
        };
        if pdf.is_empty() {
            return Err(RenderFailure::Failed("browser returned an empty PDF".into()));
        }

        let tmp_path = dest.with_extension("pdf.part");
        let written = match tokio::fs::write(&tmp_path, &pdf).await {
            Ok(()) => tokio::fs::rename(&tmp_path, dest).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            remove_partial(&tmp_path).await;
            return Err(RenderFailure::Failed(format!(
                "write {}: {e}",
                dest.display()
            )));
        }
        Ok(())
    }

    /// Launch, print, and shut the browser down again.
    ///
    /// Dropping this future (on timeout) drops the `Browser`, which kills the
    /// child process.
    async fn print_with_browser(
        &self,
        config: BrowserConfig,
        url: &str,
    ) -> Result<Vec<u8>, RenderFailure> {
        let (mut browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            RenderFailure::Failed(format!("could not start {}: {e}", self.browser.display()))
        })?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = match browser.new_page("about:blank").await {
            Ok(page) => {
                let printed = self.print_page(&page, url).await;
                if let Err(e) = page.close().await {
                    debug!("Closing page for {url} failed: {e}");
                }
                printed
            }
            Err(e) => Err(RenderFailure::Failed(format!("new page: {e}"))),
        };

        if let Err(e) = browser.close().await {
            debug!("Closing browser failed: {e}");
        }
        let _ = browser.wait().await;
        events.abort();
        result
    }

    async fn print_page(&self, page: &Page, url: &str) -> Result<Vec<u8>, RenderFailure> {
        let failed = |step: &str, e: chromiumoxide::error::CdpError| {
            RenderFailure::Failed(format!("{step}: {e}"))
        };

        let navigated = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| failed("navigate", e))?;
        if let Some(ref error_text) = navigated.result.error_text {
            return Err(RenderFailure::Failed(format!("navigate: {error_text}")));
        }
        page.wait_for_navigation()
            .await
            .map_err(|e| failed("load", e))?;

        let mut quiet = EvaluateParams::new(NETWORK_QUIET_JS);
        quiet.await_promise = Some(true);
        quiet.return_by_value = Some(true);
        page.evaluate_expression(quiet)
            .await
            .map_err(|e| failed("network idle", e))?;

        page.evaluate_expression(EvaluateParams::new(strip_script()))
            .await
            .map_err(|e| failed("strip page", e))?;

        page.pdf(self.layout.to_params())
            .await
            .map_err(|e| failed("print", e))
    }
}

impl PdfRenderer for ChromeRenderer {
    fn render<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<(), RenderFailure>> {
        Box::pin(self.run(url, dest))
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}
