//! Pipeline stages shared by the fetch job, the batch downloader and the
//! watcher.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ naming ──▶ download ─┬─▶ file on disk
//! (JSON)    (file names)  (GET)  └─▶ render (headless browser) ─▶ file on disk
//! ```
//!
//! 1. [`input`]    — load and validate payloads, report lists and URLs
//! 2. [`naming`]   — decide every output file name before any I/O happens
//! 3. [`download`] — plain HTTP GET with PDF sniffing and atomic writes
//! 4. [`render`]   — print a page to PDF through an external browser process

pub mod download;
pub mod input;
pub mod naming;
pub mod render;
