//! # browser-auto
//!
//! Locate a Chromium-family executable that can print pages to PDF in
//! headless mode, so CI jobs do not need to hard-code where the runner image
//! happened to install Chrome.
//!
//! ## How it works
//!
//! On first call to [`ensure_browser`]:
//!
//! 1. Honours `PIB_CHROME_PATH` if it points to an existing file.
//! 2. Checks `~/.cache/pib-pdfs/chromium/` for a dropped-in binary
//!    (e.g. `chrome-headless-shell` unpacked by a setup step).
//! 3. Searches `PATH` for the usual executable names.
//! 4. Falls back to the well-known install locations for the platform.
//!
//! The resolved path is memoised for the rest of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use browser_auto::ensure_browser;
//!
//! let chrome = ensure_browser().expect("no headless browser installed");
//! println!("printing with {}", chrome.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `PIB_CHROME_PATH` — path to an existing browser executable.
//! - `BROWSER_AUTO_CACHE_DIR` — override the default cache directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming an explicit browser executable.
pub const ENV_BROWSER_PATH: &str = "PIB_CHROME_PATH";

/// Environment variable overriding the cache directory.
pub const ENV_CACHE_DIR: &str = "BROWSER_AUTO_CACHE_DIR";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by browser-auto operations.
#[derive(Error, Debug)]
pub enum BrowserAutoError {
    /// The current OS/architecture combination has no known browser layout.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// No candidate executable exists.
    #[error(
        "No headless-capable browser found ({} locations searched).\n\
Install chromium or google-chrome, or set PIB_CHROME_PATH=/path/to/chrome.",
        .searched.len()
    )]
    NotFound { searched: Vec<PathBuf> },

    /// A file exists at the path but cannot be executed.
    #[error("Browser at '{path}' is not executable")]
    NotExecutable { path: PathBuf },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Executable names looked up on `PATH`, in preference order.
    executable_names: &'static [&'static str],
    /// Absolute install locations tried after `PATH`.
    install_paths: &'static [&'static str],
}

fn detect_platform() -> Result<PlatformInfo, BrowserAutoError> {
    match std::env::consts::OS {
        "linux" => Ok(PlatformInfo {
            executable_names: &[
                "chrome-headless-shell",
                "chromium",
                "chromium-browser",
                "google-chrome",
                "google-chrome-stable",
            ],
            install_paths: &[
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/usr/bin/google-chrome",
                "/snap/bin/chromium",
                "/opt/google/chrome/chrome",
            ],
        }),
        "macos" => Ok(PlatformInfo {
            executable_names: &["chrome-headless-shell", "chromium", "google-chrome"],
            install_paths: &[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ],
        }),
        "windows" => Ok(PlatformInfo {
            executable_names: &["chrome-headless-shell.exe", "chrome.exe", "msedge.exe"],
            install_paths: &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            ],
        }),
        os => Err(BrowserAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }),
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the directory where a setup step may drop a browser binary.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/pib-pdfs/chromium/`
/// - **Linux**: `~/.cache/pib-pdfs/chromium/`
/// - **Windows**: `%LOCALAPPDATA%\pib-pdfs\chromium\`
///
/// Override by setting `BROWSER_AUTO_CACHE_DIR`.
pub fn browser_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(ENV_CACHE_DIR) {
        return PathBuf::from(override_dir).join("chromium");
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("pib-pdfs").join("chromium")
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolves the browser executable, memoising the answer for the process.
///
/// Safe to call from multiple threads; concurrent first calls may both
/// search, but they agree on the result.
pub fn ensure_browser() -> Result<PathBuf, BrowserAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_browser()?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Searches for a browser executable without consulting the memo.
pub fn locate_browser() -> Result<PathBuf, BrowserAutoError> {
    let info = detect_platform()?;
    locate_with(
        std::env::var_os(ENV_BROWSER_PATH).map(PathBuf::from),
        &browser_cache_dir(),
        std::env::var_os("PATH"),
        &info,
    )
}

/// Validates an explicitly configured browser path.
pub fn browser_from_path(path: &Path) -> Result<PathBuf, BrowserAutoError> {
    if !path.is_file() {
        return Err(BrowserAutoError::NotFound {
            searched: vec![path.to_path_buf()],
        });
    }
    if !is_executable(path) {
        return Err(BrowserAutoError::NotExecutable {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn locate_with(
    env_override: Option<PathBuf>,
    cache_dir: &Path,
    path_var: Option<OsString>,
    info: &PlatformInfo,
) -> Result<PathBuf, BrowserAutoError> {
    let mut searched = Vec::new();

    // 1. Environment variable override.
    if let Some(p) = env_override {
        if p.is_file() {
            return browser_from_path(&p);
        }
        // Set but missing: keep looking, the runner image may still have one.
        searched.push(p);
    }

    // 2. Cache directory.
    for name in info.executable_names {
        let candidate = cache_dir.join(name);
        if is_usable(&candidate) {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    // 3. PATH lookup.
    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(&path_var) {
            for name in info.executable_names {
                let candidate = dir.join(name);
                if is_usable(&candidate) {
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }
    }

    // 4. Well-known install locations.
    for p in info.install_paths {
        let candidate = PathBuf::from(p);
        if is_usable(&candidate) {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(BrowserAutoError::NotFound { searched })
}

fn is_usable(path: &Path) -> bool {
    path.is_file() && is_executable(path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
