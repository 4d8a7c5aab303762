//! Zip archive assembly for cover exports.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::num::NonZeroUsize;
use std::sync::Arc;

use covered_catalog::CatalogStore;
use futures_util::{StreamExt, future, stream};
use tracing::{debug, error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::download::ImageFetcher;

/// A zip with no entries: just the end-of-central-directory record.
const EMPTY_ARCHIVE: [u8; 22] = [
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Returns a valid zip archive with no entries.
///
/// Written by [`ZipWriter`]; the fixed record is used only if that fails.
pub fn empty_archive() -> Vec<u8> {
    match ZipWriter::new(Cursor::new(Vec::new())).finish() {
        Ok(cursor) => cursor.into_inner(),
        Err(e) => {
            error!(error = %e, "failed to write empty archive");
            EMPTY_ARCHIVE.to_vec()
        }
    }
}

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Lower bound for the download worker count.
    pub min_workers: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { min_workers: 2 }
    }
}

/// One resolved export item.
struct ArchiveEntry {
    index: usize,
    path: String,
    bytes: Vec<u8>,
}

/// Builds zip archives from cover ids.
pub struct ExportBuilder {
    store: Arc<dyn CatalogStore>,
    fetcher: Arc<dyn ImageFetcher>,
    config: ExportConfig,
}

impl ExportBuilder {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        fetcher: Arc<dyn ImageFetcher>,
        config: ExportConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Number of concurrent downloads for one build.
    pub fn worker_count(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        cpus.max(self.config.min_workers).max(1)
    }

    /// Downloads the image behind every cover id and packs the results into
    /// a zip, one entry per cover at `{steam_app_id}/{capsule_filename}`.
    ///
    /// Entries follow input order. When two covers map to the same path the
    /// earlier one wins. Unresolvable covers are skipped, and a failure
    /// writing the archive yields an empty archive.
    pub async fn build_archive(&self, cover_ids: &[String]) -> Vec<u8> {
        if cover_ids.is_empty() {
            return empty_archive();
        }

        let workers = self.worker_count();
        debug!(covers = cover_ids.len(), workers, "building cover archive");

        let mut entries: Vec<ArchiveEntry> = stream::iter(cover_ids.iter().enumerate())
            .map(|(index, cover_id)| self.resolve(index, cover_id))
            .buffer_unordered(workers)
            .filter_map(future::ready)
            .collect()
            .await;
        entries.sort_by_key(|entry| entry.index);

        match write_archive(&entries) {
            Ok(archive) => {
                info!(
                    requested = cover_ids.len(),
                    exported = entries.len(),
                    bytes = archive.len(),
                    "built cover archive"
                );
                archive
            }
            Err(e) => {
                error!(error = %e, "failed to write cover archive");
                empty_archive()
            }
        }
    }

    /// Walks one cover id down to its image bytes, or `None` at the first
    /// missing link.
    async fn resolve(&self, index: usize, cover_id: &str) -> Option<ArchiveEntry> {
        let cover = match self.store.find_cover_by_id(cover_id) {
            Ok(Some(cover)) => cover,
            Ok(None) => {
                debug!(cover_id, "cover not found, skipping");
                return None;
            }
            Err(e) => {
                error!(cover_id, error = %e, "cover lookup failed, skipping");
                return None;
            }
        };

        let Some(game_id) = cover.game_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            debug!(cover_id, "cover not linked to a game, skipping");
            return None;
        };

        let game = match self.store.find_game_by_id(game_id) {
            Ok(Some(game)) => game,
            Ok(None) => {
                debug!(cover_id, game_id, "game not found, skipping");
                return None;
            }
            Err(e) => {
                error!(cover_id, game_id, error = %e, "game lookup failed, skipping");
                return None;
            }
        };

        let Some(app_id) = game.steam_app_id else {
            debug!(cover_id, game_id, "game has no steam app id, skipping");
            return None;
        };
        if game.capsule_filename.trim().is_empty() {
            debug!(cover_id, game_id, "game has no capsule filename, skipping");
            return None;
        }

        let bytes = match self.fetcher.fetch(&cover.url).await {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                debug!(cover_id, url = %cover.url, "cover image unavailable, skipping");
                return None;
            }
        };

        Some(ArchiveEntry {
            index,
            path: format!("{app_id}/{}", game.capsule_filename),
            bytes,
        })
    }
}

fn write_archive(entries: &[ArchiveEntry]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut paths = HashSet::new();

    for entry in entries {
        if !paths.insert(entry.path.as_str()) {
            debug!(path = %entry.path, "duplicate archive path, keeping first");
            continue;
        }
        zip.start_file(entry.path.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use covered_catalog::{Cover, Game, JsonCatalogStore};
    use zip::ZipArchive;

    use crate::download::tests::mock_images;
    use crate::download::{AssetDownloader, DownloaderConfig, FetchFuture};

    /// Serves bytes from a table, optionally after a per-url delay, and
    /// tracks how many fetches run at once.
    #[derive(Default)]
    struct FakeFetcher {
        images: HashMap<String, Vec<u8>>,
        delays: HashMap<String, Duration>,
        requested: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.images.insert(url.to_string(), bytes);
            self
        }

        fn delayed(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }
    }

    impl ImageFetcher for FakeFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
            Box::pin(async move {
                self.requested.lock().unwrap().push(url.to_string());
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                if let Some(delay) = self.delays.get(url) {
                    tokio::time::sleep(*delay).await;
                }
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.images.get(url).cloned()
            })
        }
    }

    fn seed_game(store: &JsonCatalogStore, app_id: Option<u64>, capsule: &str) -> Game {
        store
            .save_game(Game {
                name: format!("Game {app_id:?}"),
                steam_app_id: app_id,
                capsule_filename: capsule.into(),
                ..Default::default()
            })
            .unwrap()
    }

    fn seed_cover(store: &JsonCatalogStore, game_id: Option<&str>, url: &str) -> String {
        store
            .save_covers(vec![Cover {
                game_id: game_id.map(str::to_string),
                url: url.into(),
                ..Default::default()
            }])
            .unwrap()
            .remove(0)
            .id
    }

    fn builder(store: &Arc<JsonCatalogStore>, fetcher: impl ImageFetcher + 'static) -> ExportBuilder {
        ExportBuilder::new(
            Arc::clone(store) as Arc<dyn CatalogStore>,
            Arc::new(fetcher),
            ExportConfig::default(),
        )
    }

    fn open(bytes: Vec<u8>) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(bytes)).expect("valid zip")
    }

    fn names(archive: &mut ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn entry_bytes(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut data = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn empty_archive_is_valid_zip() {
        assert_eq!(open(empty_archive()).len(), 0);
        assert_eq!(open(EMPTY_ARCHIVE.to_vec()).len(), 0);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_archive() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let fetcher = FakeFetcher::default();

        let archive = builder(&store, fetcher).build_archive(&[]).await;
        assert_eq!(open(archive).len(), 0);
    }

    #[tokio::test]
    async fn unknown_cover_gives_empty_archive() {
        let store = Arc::new(JsonCatalogStore::in_memory());

        let archive = builder(&store, FakeFetcher::default())
            .build_archive(&["no-such-cover".to_string()])
            .await;
        assert_eq!(open(archive).len(), 0);
    }

    #[tokio::test]
    async fn single_cover_lands_at_app_path() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let game = seed_game(&store, Some(570), "cap.jpg");
        let cover = seed_cover(&store, Some(&game.id), "https://cdn/570.png");
        let fetcher = FakeFetcher::default().with("https://cdn/570.png", vec![1u8; 2000]);

        let mut archive = open(builder(&store, fetcher).build_archive(&[cover]).await);

        assert_eq!(names(&mut archive), vec!["570/cap.jpg"]);
        assert_eq!(entry_bytes(&mut archive, "570/cap.jpg").len(), 2000);
    }

    #[tokio::test]
    async fn skip_chain_drops_unresolvable_items() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let good = seed_game(&store, Some(400), "portal.jpg");
        let no_app = seed_game(&store, None, "x.jpg");
        let no_capsule = seed_game(&store, Some(10), "");

        let ids = vec![
            seed_cover(&store, None, "https://cdn/unlinked.png"),
            seed_cover(&store, Some("   "), "https://cdn/blank.png"),
            seed_cover(&store, Some("ghost-game"), "https://cdn/ghost.png"),
            seed_cover(&store, Some(&no_app.id), "https://cdn/noapp.png"),
            seed_cover(&store, Some(&no_capsule.id), "https://cdn/nocap.png"),
            seed_cover(&store, Some(&good.id), "https://cdn/empty.png"),
            seed_cover(&store, Some(&good.id), "https://cdn/missing.png"),
        ];
        let fetcher = FakeFetcher::default()
            .with("https://cdn/unlinked.png", vec![1])
            .with("https://cdn/ghost.png", vec![1])
            .with("https://cdn/noapp.png", vec![1])
            .with("https://cdn/nocap.png", vec![1])
            .with("https://cdn/empty.png", Vec::new());
        let builder = builder(&store, fetcher);

        let archive = builder.build_archive(&ids).await;
        assert_eq!(open(archive).len(), 0);
    }

    #[tokio::test]
    async fn downloads_only_for_resolved_covers() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let no_app = seed_game(&store, None, "x.jpg");
        let ids = vec![
            seed_cover(&store, None, "https://cdn/a.png"),
            seed_cover(&store, Some(&no_app.id), "https://cdn/b.png"),
        ];
        let fetcher = Arc::new(FakeFetcher::default());
        let builder = ExportBuilder::new(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            Arc::clone(&fetcher) as Arc<dyn ImageFetcher>,
            ExportConfig::default(),
        );

        builder.build_archive(&ids).await;
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_follow_input_order() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let mut ids = Vec::new();
        for app_id in [30, 10, 20] {
            let game = seed_game(&store, Some(app_id), "cap.jpg");
            ids.push(seed_cover(&store, Some(&game.id), &format!("https://cdn/{app_id}")));
        }
        // The first item finishes last.
        let fetcher = FakeFetcher::default()
            .with("https://cdn/30", vec![3])
            .with("https://cdn/10", vec![1])
            .with("https://cdn/20", vec![2])
            .delayed("https://cdn/30", Duration::from_millis(50));

        let mut archive = open(builder(&store, fetcher).build_archive(&ids).await);
        assert_eq!(
            names(&mut archive),
            vec!["30/cap.jpg", "10/cap.jpg", "20/cap.jpg"]
        );
    }

    #[tokio::test]
    async fn path_collision_keeps_first_input() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let game = seed_game(&store, Some(570), "cap.jpg");
        let first = seed_cover(&store, Some(&game.id), "https://cdn/first");
        let second = seed_cover(&store, Some(&game.id), "https://cdn/second");
        let fetcher = FakeFetcher::default()
            .with("https://cdn/first", b"first".to_vec())
            .with("https://cdn/second", b"second".to_vec())
            .delayed("https://cdn/first", Duration::from_millis(30));

        let mut archive = open(builder(&store, fetcher).build_archive(&[first, second]).await);
        assert_eq!(archive.len(), 1);
        assert_eq!(entry_bytes(&mut archive, "570/cap.jpg"), b"first");
    }

    #[tokio::test]
    async fn failed_download_shrinks_archive() {
        let (base, _seen) = mock_images(vec![
            ("/a.png", 200, vec![1u8; 10]),
            ("/b.png", 500, b"boom".to_vec()),
            ("/c.png", 200, vec![3u8; 30]),
        ])
        .await;

        let store = Arc::new(JsonCatalogStore::in_memory());
        let mut ids = Vec::new();
        for (app_id, file) in [(1, "a.png"), (2, "b.png"), (3, "c.png")] {
            let game = seed_game(&store, Some(app_id), "cap.jpg");
            ids.push(seed_cover(&store, Some(&game.id), &format!("{base}/{file}")));
        }
        let downloader = AssetDownloader::new(&DownloaderConfig::default()).unwrap();

        let mut archive = open(builder(&store, downloader).build_archive(&ids).await);
        assert_eq!(names(&mut archive), vec!["1/cap.jpg", "3/cap.jpg"]);
        assert_eq!(entry_bytes(&mut archive, "3/cap.jpg").len(), 30);
    }

    #[test]
    fn worker_count_respects_floor() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let builder = ExportBuilder::new(
            store,
            Arc::new(FakeFetcher::default()),
            ExportConfig { min_workers: 64 },
        );
        assert!(builder.worker_count() >= 64);

        let zero = ExportBuilder::new(
            Arc::new(JsonCatalogStore::in_memory()),
            Arc::new(FakeFetcher::default()),
            ExportConfig { min_workers: 0 },
        );
        assert!(zero.worker_count() >= 1);
    }

    #[tokio::test]
    async fn downloads_run_in_parallel_up_to_worker_count() {
        let store = Arc::new(JsonCatalogStore::in_memory());
        let mut ids = Vec::new();
        let mut fetcher = FakeFetcher::default();
        for app_id in 1..=12 {
            let url = format!("https://cdn/{app_id}");
            let game = seed_game(&store, Some(app_id), "cap.jpg");
            ids.push(seed_cover(&store, Some(&game.id), &url));
            fetcher = fetcher
                .with(&url, vec![app_id as u8])
                .delayed(&url, Duration::from_millis(30));
        }
        let fetcher = Arc::new(fetcher);
        let builder = ExportBuilder::new(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            Arc::clone(&fetcher) as Arc<dyn ImageFetcher>,
            ExportConfig { min_workers: 3 },
        );

        let archive = open(builder.build_archive(&ids).await);
        assert_eq!(archive.len(), 12);

        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert!(peak >= 3, "peak {peak}");
        assert!(peak <= builder.worker_count(), "peak {peak}");
    }
}
