//! Configuration types shared by the fetch job, batch downloader and watcher.
//!
//! Every knob lives in [`JobConfig`], built via [`JobConfigBuilder`]. The
//! output directory in particular is an explicit value handed to each
//! component; nothing relies on the process working directory.

use crate::error::FetchError;
use crate::pipeline::render::PdfRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default artifact bundle name.
pub const DEFAULT_ARTIFACT_NAME: &str = "pib-pdfs";

/// Configuration for a run.
///
/// Built via [`JobConfig::builder()`] or using [`JobConfig::default()`].
///
/// # Example
/// ```rust
/// use pib_pdfs::JobConfig;
///
/// let config = JobConfig::builder()
///     .output_dir("out/pdfs")
///     .render_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 1);
/// ```
#[derive(Clone)]
pub struct JobConfig {
    /// Directory receiving the PDFs. Created on demand. Default: `pdfs`.
    pub output_dir: PathBuf,

    /// Maximum number of items in flight. Default: 1 (strictly sequential).
    ///
    /// Results are always reported in input order whatever this is set to.
    pub concurrency: usize,

    /// How the fetch job turns a link into a PDF. Default: [`ConversionMode::Auto`].
    pub conversion_mode: ConversionMode,

    /// Per-URL budget for the headless browser, in seconds. Default: 60.
    pub render_timeout_secs: u64,

    /// Per-request timeout for plain HTTP downloads. Default: none.
    pub download_timeout_secs: Option<u64>,

    /// Timeout for the webhook POST. Default: none.
    pub webhook_timeout_secs: Option<u64>,

    /// Browser viewport used when printing, `(width, height)`. Default: 1280×1080.
    pub window_size: (u32, u32),

    /// Explicit browser executable. If None, `browser-auto` searches for one.
    pub browser_path: Option<PathBuf>,

    /// Pre-constructed renderer. Takes precedence over `browser_path`.
    pub renderer: Option<Arc<dyn PdfRenderer>>,

    /// Artifact bundle name. Default: `pib-pdfs`.
    pub artifact_name: String,

    /// Directory under which artifact bundles are published. Default: `artifacts`.
    pub artifact_root: PathBuf,

    /// What to do when there is nothing to publish. Default: [`IfNoFilesFound::Warn`].
    pub if_no_files_found: IfNoFilesFound,

    /// CI run identifier echoed in the webhook metadata.
    pub run_id: Option<String>,

    /// `User-Agent` sent with every HTTP request.
    pub user_agent: String,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("pdfs"),
            concurrency: 1,
            conversion_mode: ConversionMode::default(),
            render_timeout_secs: 60,
            download_timeout_secs: None,
            webhook_timeout_secs: None,
            window_size: (1280, 1080),
            browser_path: None,
            renderer: None,
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            artifact_root: PathBuf::from("artifacts"),
            if_no_files_found: IfNoFilesFound::default(),
            run_id: None,
            user_agent: concat!("pib-pdfs/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("conversion_mode", &self.conversion_mode)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("webhook_timeout_secs", &self.webhook_timeout_secs)
            .field("window_size", &self.window_size)
            .field("browser_path", &self.browser_path)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PdfRenderer>"))
            .field("artifact_name", &self.artifact_name)
            .field("artifact_root", &self.artifact_root)
            .field("if_no_files_found", &self.if_no_files_found)
            .field("run_id", &self.run_id)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ProgressReporter>"),
            )
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`JobConfig`].
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn conversion_mode(mut self, mode: ConversionMode) -> Self {
        self.config.conversion_mode = mode;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn webhook_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.webhook_timeout_secs = secs;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width.max(320), height.max(240));
        self
    }

    pub fn browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.browser_path = Some(path.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn artifact_name(mut self, name: impl Into<String>) -> Self {
        self.config.artifact_name = name.into();
        self
    }

    pub fn artifact_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_root = dir.into();
        self
    }

    pub fn if_no_files_found(mut self, policy: IfNoFilesFound) -> Self {
        self.config.if_no_files_found = policy;
        self
    }

    pub fn run_id(mut self, id: impl Into<String>) -> Self {
        self.config.run_id = Some(id.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, FetchError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(FetchError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        let name = c.artifact_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(FetchError::InvalidConfig(format!(
                "Artifact name must be a single path component, got {:?}",
                c.artifact_name
            )));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(FetchError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a trigger link becomes a PDF on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversionMode {
    /// Probe the URL first: save PDFs as-is, print everything else. (default)
    #[default]
    Auto,
    /// Always print through the headless browser.
    Render,
    /// Always save the response body without rendering.
    Download,
}

/// Policy when an artifact directory turns out to be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IfNoFilesFound {
    /// Log a warning and report success. (default)
    #[default]
    Warn,
    /// Fail with [`FetchError::EmptyArtifact`].
    Error,
    /// Succeed silently.
    Ignore,
}
