//! The fetch → detect → extract state machine.
//!
//! [`ExtractionPipeline::run`] returns an [`ExtractionRun`], a one-shot
//! iterator of [`Event`]s. Each call to `next` performs the work of exactly
//! one stage, so an event is observable as soon as its stage completes and
//! later stages do not start until the consumer asks for the next event.

use crate::core::decoder::DecoderRegistry;
use crate::core::detect::{detect_by_content, detect_by_name, FormatTag};
use crate::core::event::Event;
use crate::core::fetch::{ByteBuffer, Fetch};
use crate::error::ExtractError;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reusable configuration for extraction runs.
pub struct ExtractionPipeline<F> {
    fetcher: F,
    registry: &'static DecoderRegistry,
    destination: PathBuf,
}

impl<F: Fetch> ExtractionPipeline<F> {
    pub fn new<P: Into<PathBuf>>(fetcher: F, destination: P) -> Self {
        Self {
            fetcher,
            registry: DecoderRegistry::standard(),
            destination: destination.into(),
        }
    }

    pub fn with_registry(mut self, registry: &'static DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Starts a run for `url`. Nothing happens until the events are pulled.
    pub fn run<'a>(&'a self, url: &'a str) -> ExtractionRun<'a, F> {
        ExtractionRun {
            pipeline: self,
            url,
            buffer: None,
            stage: Stage::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    MissingUrl,
    Failing,
    Downloading,
    Fetching,
    Detecting,
    Classifying,
    ExtractingKnown(FormatTag),
    SwitchingToTryAll,
    ExtractingByContent,
    Finishing,
    Done,
}

/// A single in-flight extraction. Owns the downloaded buffer until it is
/// dropped.
pub struct ExtractionRun<'a, F> {
    pipeline: &'a ExtractionPipeline<F>,
    url: &'a str,
    buffer: Option<ByteBuffer>,
    stage: Stage,
}

impl<F: Fetch> ExtractionRun<'_, F> {
    fn advance(&mut self) -> Option<Event> {
        let (event, next) = match self.stage {
            Stage::Start if self.url.is_empty() => (Event::ExtractStarted, Stage::MissingUrl),
            Stage::Start => (Event::ExtractStarted, Stage::Downloading),
            Stage::MissingUrl => (Event::UrlMissing, Stage::Failing),
            Stage::Failing => (Event::ExtractFailed, Stage::Finishing),
            Stage::Downloading => (Event::DownloadStarted, Stage::Fetching),
            Stage::Fetching => match self.pipeline.fetcher.fetch(self.url) {
                Ok(buffer) => {
                    debug!("Fetched {} bytes", buffer.len());
                    self.buffer = Some(buffer);
                    (Event::DownloadSuccess, Stage::Detecting)
                }
                Err(e) => {
                    warn!("{e}");
                    (Event::DownloadAborted, Stage::Finishing)
                }
            },
            Stage::Detecting => (Event::TypeDetectionStarted, Stage::Classifying),
            Stage::Classifying => match detect_by_name(self.url) {
                Some(tag) => (
                    Event::TypeDetectionSuccess {
                        suggested_type: tag,
                    },
                    Stage::ExtractingKnown(tag),
                ),
                None => (Event::TypeDetectionFailed, Stage::SwitchingToTryAll),
            },
            Stage::ExtractingKnown(tag) => (self.extract_as(tag), Stage::Finishing),
            Stage::SwitchingToTryAll => (Event::SwitchToTryAllMode, Stage::ExtractingByContent),
            Stage::ExtractingByContent => (self.extract_by_content(), Stage::Finishing),
            Stage::Finishing => (Event::ExtractFinished, Stage::Done),
            Stage::Done => return None,
        };

        self.stage = next;
        Some(event)
    }

    fn extract_as(&mut self, tag: FormatTag) -> Event {
        let result = self.take_buffer().and_then(|buffer| {
            self.pipeline
                .registry
                .resolve(tag)?
                .extract(&buffer, &self.pipeline.destination)
        });
        outcome_event(result)
    }

    fn extract_by_content(&mut self) -> Event {
        let result = self.take_buffer().and_then(|buffer| {
            let tag = detect_by_content(&buffer).unwrap_or(FormatTag::TarGz);
            debug!("Trying {tag} decoder");
            self.pipeline
                .registry
                .resolve(tag)?
                .extract(&buffer, &self.pipeline.destination)
                .map_err(ExtractError::into_failure)
        });
        outcome_event(result)
    }

    // The buffer is only needed by the single extraction stage; releasing it
    // there keeps memory bounded to one stage.
    fn take_buffer(&mut self) -> Result<ByteBuffer, ExtractError> {
        self.buffer.take().ok_or_else(|| ExtractError::MalformedArchive {
            reason: "no downloaded data".to_string(),
        })
    }
}

fn outcome_event(result: Result<(), ExtractError>) -> Event {
    match result {
        Ok(()) => Event::ExtractSuccess,
        Err(e) => {
            warn!("{e}");
            Event::ExtractFailed
        }
    }
}

impl<F: Fetch> Iterator for ExtractionRun<'_, F> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.advance()
    }
}

impl<F: Fetch> FusedIterator for ExtractionRun<'_, F> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::utils::fs::is_empty_dir;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Write};
    use std::sync::LazyLock;
    use zip::write::SimpleFileOptions;

    /// Serves a fixed body for every URL and counts calls.
    struct StaticFetcher {
        body: Option<Vec<u8>>,
        calls: Cell<usize>,
    }

    impl StaticFetcher {
        fn serving(body: Vec<u8>) -> Self {
            Self {
                body: Some(body),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                calls: Cell::new(0),
            }
        }
    }

    impl Fetch for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<ByteBuffer, FetchError> {
            self.calls.set(self.calls.get() + 1);
            match &self.body {
                Some(body) => Ok(ByteBuffer::from(body.clone())),
                None => Err(FetchError::network(url, "connection refused")),
            }
        }
    }

    const ENTRIES: [(&str, &[u8]); 3] = [
        ("top.txt", b"top level"),
        ("nested/dir/file.txt", b"nested content"),
        ("nested/other.bin", &[0, 1, 2, 3, 255]),
    ];

    fn zip_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in ENTRIES {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn tar_gz_bytes() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in ENTRIES {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data).unwrap();
        }
        gzip(&builder.into_inner().unwrap())
    }

    fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
        fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(root, &path, files);
                } else {
                    let relative = path.strip_prefix(root).unwrap();
                    let key = relative.to_string_lossy().replace('\\', "/");
                    files.insert(key, std::fs::read(&path).unwrap());
                }
            }
        }

        let mut files = BTreeMap::new();
        if root.exists() {
            walk(root, root, &mut files);
        }
        files
    }

    fn expected_tree() -> BTreeMap<String, Vec<u8>> {
        ENTRIES
            .iter()
            .map(|(name, data)| (name.to_string(), data.to_vec()))
            .collect()
    }

    #[test]
    fn test_missing_url() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(zip_bytes());
        let pipeline = ExtractionPipeline::new(&fetcher, dir.path());

        let events: Vec<Event> = pipeline.run("").collect();

        assert_eq!(
            events,
            vec![
                Event::ExtractStarted,
                Event::UrlMissing,
                Event::ExtractFailed,
                Event::ExtractFinished,
            ]
        );
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_download_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(StaticFetcher::failing(), dir.path());

        let events: Vec<Event> = pipeline.run("https://example.com/a.zip").collect();

        assert_eq!(
            events,
            vec![
                Event::ExtractStarted,
                Event::DownloadStarted,
                Event::DownloadAborted,
                Event::ExtractFinished,
            ]
        );
    }

    #[test]
    fn test_known_zip() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(StaticFetcher::serving(zip_bytes()), dir.path());

        let events: Vec<Event> = pipeline.run("https://example.com/a.zip").collect();

        assert_eq!(
            events,
            vec![
                Event::ExtractStarted,
                Event::DownloadStarted,
                Event::DownloadSuccess,
                Event::TypeDetectionStarted,
                Event::TypeDetectionSuccess {
                    suggested_type: FormatTag::Zip
                },
                Event::ExtractSuccess,
                Event::ExtractFinished,
            ]
        );
        assert_eq!(read_tree(dir.path()), expected_tree());
    }

    #[test]
    fn test_known_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            ExtractionPipeline::new(StaticFetcher::serving(tar_gz_bytes()), dir.path());

        let events: Vec<Event> = pipeline.run("https://example.com/pkg.tar.gz").collect();

        assert_eq!(
            events[4],
            Event::TypeDetectionSuccess {
                suggested_type: FormatTag::TarGz
            }
        );
        assert_eq!(events[5], Event::ExtractSuccess);
        assert_eq!(read_tree(dir.path()), expected_tree());
    }

    #[test]
    fn test_known_type_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let pipeline = ExtractionPipeline::new(StaticFetcher::serving(tar_gz_bytes()), &dest);

        let events: Vec<Event> = pipeline.run("https://example.com/a.zip").collect();

        assert_eq!(
            &events[4..],
            &[
                Event::TypeDetectionSuccess {
                    suggested_type: FormatTag::Zip
                },
                Event::ExtractFailed,
                Event::ExtractFinished,
            ]
        );
        assert!(is_empty_dir(&dest));
    }

    #[test]
    fn test_known_tar_gz_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let pipeline =
            ExtractionPipeline::new(StaticFetcher::serving(b"not gzip at all".to_vec()), &dest);

        let events: Vec<Event> = pipeline.run("https://example.com/pkg.tar.gz").collect();

        assert_eq!(
            &events[4..],
            &[
                Event::TypeDetectionSuccess {
                    suggested_type: FormatTag::TarGz
                },
                Event::ExtractFailed,
                Event::ExtractFinished,
            ]
        );
        assert!(is_empty_dir(&dest));
    }

    #[test]
    fn test_unnamed_zip_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(StaticFetcher::serving(zip_bytes()), dir.path());

        let events: Vec<Event> = pipeline.run("https://example.com/download?id=7").collect();

        assert_eq!(
            events,
            vec![
                Event::ExtractStarted,
                Event::DownloadStarted,
                Event::DownloadSuccess,
                Event::TypeDetectionStarted,
                Event::TypeDetectionFailed,
                Event::SwitchToTryAllMode,
                Event::ExtractSuccess,
                Event::ExtractFinished,
            ]
        );
        assert_eq!(read_tree(dir.path()), expected_tree());
    }

    #[test]
    fn test_unnamed_tar_gz_assumed_by_elimination() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            ExtractionPipeline::new(StaticFetcher::serving(tar_gz_bytes()), dir.path());

        let events: Vec<Event> = pipeline.run("https://example.com/latest").collect();

        assert_eq!(
            &events[5..],
            &[
                Event::SwitchToTryAllMode,
                Event::ExtractSuccess,
                Event::ExtractFinished
            ]
        );
        assert_eq!(read_tree(dir.path()), expected_tree());
    }

    #[test]
    fn test_unnamed_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let pipeline = ExtractionPipeline::new(
            StaticFetcher::serving(b"<html>not found</html>".to_vec()),
            &dest,
        );

        let events: Vec<Event> = pipeline.run("https://example.com/latest").collect();

        assert_eq!(
            &events[events.len() - 2..],
            &[Event::ExtractFailed, Event::ExtractFinished]
        );
        assert!(!events.contains(&Event::ExtractSuccess));
        assert!(is_empty_dir(&dest));
    }

    #[test]
    fn test_unnamed_empty_tar_gz_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        for body in [gzip(b""), gzip(&[0; 1024])] {
            let pipeline = ExtractionPipeline::new(StaticFetcher::serving(body), &dest);

            let events: Vec<Event> = pipeline.run("https://example.com/latest").collect();

            assert_eq!(
                &events[5..],
                &[
                    Event::SwitchToTryAllMode,
                    Event::ExtractFailed,
                    Event::ExtractFinished
                ]
            );
        }

        assert!(is_empty_dir(&dest));
    }

    #[test]
    fn test_events_are_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(zip_bytes());
        let pipeline = ExtractionPipeline::new(&fetcher, dir.path());
        let mut run = pipeline.run("https://example.com/a.zip");

        assert_eq!(run.next(), Some(Event::ExtractStarted));
        assert_eq!(run.next(), Some(Event::DownloadStarted));
        assert_eq!(fetcher.calls.get(), 0);

        assert_eq!(run.next(), Some(Event::DownloadSuccess));
        assert_eq!(fetcher.calls.get(), 1);
        assert!(is_empty_dir(dir.path()));
    }

    #[test]
    fn test_run_is_fused() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(StaticFetcher::failing(), dir.path());
        let mut run = pipeline.run("");

        assert_eq!(run.by_ref().count(), 4);
        assert_eq!(run.next(), None);
        assert_eq!(run.next(), None);
    }

    #[test]
    fn test_every_run_is_bracketed() {
        let dir = tempfile::tempdir().unwrap();
        let fetchers = [
            StaticFetcher::failing(),
            StaticFetcher::serving(zip_bytes()),
            StaticFetcher::serving(tar_gz_bytes()),
            StaticFetcher::serving(b"garbage".to_vec()),
        ];
        let urls = ["", "https://e.com/a.zip", "https://e.com/a.tar.gz", "https://e.com/a"];

        for fetcher in &fetchers {
            let pipeline = ExtractionPipeline::new(fetcher, dir.path().join("out"));
            for url in urls {
                let events: Vec<Event> = pipeline.run(url).collect();
                assert_eq!(events.first(), Some(&Event::ExtractStarted));
                assert_eq!(events.last(), Some(&Event::ExtractFinished));
                let started = events.iter().filter(|e| **e == Event::ExtractStarted).count();
                let finished = events.iter().filter(|e| **e == Event::ExtractFinished).count();
                assert_eq!((started, finished), (1, 1), "url {url:?}");
                let success = events.contains(&Event::ExtractSuccess);
                let failed = events.contains(&Event::ExtractFailed);
                assert!(!(success && failed), "url {url:?}");
            }
        }
    }

    #[test]
    fn test_repeat_runs_yield_same_files() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::serving(zip_bytes());

        for dir in [&first, &second] {
            let pipeline = ExtractionPipeline::new(&fetcher, dir.path());
            let events: Vec<Event> = pipeline.run("https://example.com/a.zip").collect();
            assert!(events.contains(&Event::ExtractSuccess));
        }

        assert_eq!(read_tree(first.path()), read_tree(second.path()));
    }

    #[test]
    fn test_unregistered_format_fails() {
        static ZIP_ONLY: LazyLock<DecoderRegistry> = LazyLock::new(|| {
            DecoderRegistry::empty().with(FormatTag::Zip, crate::core::decoder::ZipDecoder)
        });
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(StaticFetcher::serving(tar_gz_bytes()), dir.path())
            .with_registry(&ZIP_ONLY);

        let events: Vec<Event> = pipeline.run("https://example.com/a.tar.gz").collect();

        assert_eq!(
            &events[events.len() - 2..],
            &[Event::ExtractFailed, Event::ExtractFinished]
        );
    }
}
