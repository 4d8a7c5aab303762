//! Cover export: resolve cover ids to image bytes and pack them into a zip.
//!
//! Every requested cover is resolved independently (cover → game → Steam
//! app id → downloaded bytes); a cover that fails any step is left out of
//! the archive rather than failing the export.

pub mod archive;
pub mod download;

pub use archive::{ExportBuilder, ExportConfig, empty_archive};
pub use download::{AssetDownloader, DownloaderConfig, FetchFuture, ImageFetcher};
