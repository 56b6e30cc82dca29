//! Per-video search, selection and extraction.
//!
//! Each video goes through: search every site for its keywords, then try
//! the ranked results one at a time. A result is downloaded, and an archive
//! is walked and its entries scored. The first result that yields a
//! confident subtitle wins; failing results are logged and dropped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::archive::{list_subtitle_entries, ArchiveKind};
use crate::config::Config;
use crate::downloader::{DownloadKind, DownloaderRegistry};
use crate::keywords::build_keywords;
use crate::select::{pick_best, SearchResult};
use crate::video::Video;
use crate::{file_name, split_extension, Error};

/// A subtitle written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSubtitle {
    /// Archive entry path, or the search result name for bare downloads.
    pub source: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum VideoOutcome {
    /// A subtitle already exists and overwriting is off.
    Skipped,
    Done(Vec<ExtractedSubtitle>),
    NoResults,
    /// Every search result failed; one reason per result.
    NoMatch(Vec<String>),
}

impl VideoOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VideoOutcome::Skipped | VideoOutcome::Done(_))
    }

    /// Failure message for the run report, `None` on success.
    pub fn failure(&self) -> Option<String> {
        match self {
            VideoOutcome::Skipped | VideoOutcome::Done(_) => None,
            VideoOutcome::NoResults => Some("no search results".to_string()),
            VideoOutcome::NoMatch(reasons) if reasons.is_empty() => {
                Some("failed to guess one subtitle".to_string())
            }
            VideoOutcome::NoMatch(reasons) => Some(format!(
                "failed to guess one subtitle ({})",
                reasons.join("; ")
            )),
        }
    }
}

/// Why a single search result was dropped.
#[derive(Debug, ThisError)]
enum CandidateError {
    #[error("no subtitle in this archive")]
    EmptyArchive,

    #[error("no guess result in auto mode")]
    NoGuess,

    #[error("no downloader for {0}")]
    NoDownloader(String),

    #[error(transparent)]
    Failed(#[from] Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedVideo {
    pub name: String,
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub success: usize,
    pub fail: usize,
    pub failed: Vec<FailedVideo>,
}

impl RunReport {
    pub fn record(&mut self, video: &Video, outcome: &VideoOutcome) {
        self.total += 1;
        match outcome.failure() {
            None => self.success += 1,
            Some(error) => {
                self.fail += 1;
                self.failed.push(FailedVideo {
                    name: video.name.clone(),
                    path: video.dir.display().to_string(),
                    error,
                });
            }
        }
    }
}

fn save(path: &Path, data: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

pub struct Pipeline {
    config: Config,
    registry: DownloaderRegistry,
}

impl Pipeline {
    pub fn new(config: Config, registry: DownloaderRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, videos: &[Video]) -> RunReport {
        self.run_with(videos, |_, _| {})
    }

    /// Process every video, calling `observer` after each one.
    pub fn run_with<F>(&self, videos: &[Video], mut observer: F) -> RunReport
    where
        F: FnMut(&Video, &VideoOutcome),
    {
        let mut report = RunReport::default();
        for video in videos {
            let outcome = self.process_video(video);
            observer(video, &outcome);
            report.record(video, &outcome);
        }
        report
    }

    pub fn process_video(&self, video: &Video) -> VideoOutcome {
        if video.has_subtitle && !self.config.over {
            info!(video = %video.name, "subtitle already exists, skipping");
            return VideoOutcome::Skipped;
        }

        let keywords = build_keywords(&video.descriptor);
        let mut results = self.registry.search_all(&keywords, self.config.sub_num);
        if results.is_empty() {
            info!(video = %video.name, query = %keywords.query(), "no search results");
            return VideoOutcome::NoResults;
        }
        info!(video = %video.name, results = results.len(), "searching done");

        let mut reasons = Vec::new();
        while !results.is_empty() {
            let result = results.remove(0);
            info!(result = %result.name, languages = %result.languages.label(), "trying result");
            match self.process_result(video, &result) {
                Ok(extracted) => {
                    info!(video = %video.name, result = %result.name, "subtitle extracted");
                    return VideoOutcome::Done(extracted);
                }
                Err(e) => {
                    warn!(result = %result.name, error = %e, "result dropped");
                    reasons.push(format!("{}: {}", result.name, e));
                }
            }
        }

        VideoOutcome::NoMatch(reasons)
    }

    fn process_result(
        &self,
        video: &Video,
        result: &SearchResult,
    ) -> Result<Vec<ExtractedSubtitle>, CandidateError> {
        let downloader = self
            .registry
            .for_result(result)
            .ok_or_else(|| CandidateError::NoDownloader(result.name.clone()))?;
        let download = downloader.download(result)?;

        let extracted = match &download.kind {
            DownloadKind::Archive(kind) => self.process_archive(video, &download.data, *kind)?,
            DownloadKind::Subtitle(ext) => {
                vec![self.process_subtitle(video, &result.name, &download.data, ext)?]
            }
            DownloadKind::Unknown(ext) => return Err(Error::UnsupportedFormat(ext.clone()).into()),
        };

        if self.config.more {
            if let DownloadKind::Archive(kind) = download.kind {
                let archive_path = video
                    .store_path
                    .join(format!("{}{}", result.name, kind.extension()));
                save(&archive_path, &download.data)?;
                info!(path = %archive_path.display(), "saved original archive");
            }
        }

        Ok(extracted)
    }

    fn process_archive(
        &self,
        video: &Video,
        data: &[u8],
        kind: ArchiveKind,
    ) -> Result<Vec<ExtractedSubtitle>, CandidateError> {
        let entries = list_subtitle_entries(data, kind)?;
        if entries.is_empty() {
            return Err(CandidateError::EmptyArchive);
        }

        let names = entries.names();
        let selection = pick_best(&names, &video.descriptor);
        let chosen = match selection.chosen {
            Some(chosen) if selection.success => chosen,
            _ => return Err(CandidateError::NoGuess),
        };

        let ext = split_extension(&chosen).1;
        let mut targets = vec![(chosen.clone(), ext.to_lowercase())];

        if self.config.both {
            let other = if ext.eq_ignore_ascii_case(".ass") {
                ".srt"
            } else {
                ".ass"
            };
            let sibling = chosen.replace(ext, other);
            let sibling = file_name(&sibling);
            match names.iter().find(|name| name.contains(sibling)) {
                Some(name) => targets.push((name.to_string(), other.to_string())),
                None => info!("no {} subtitles in this archive", other),
            }
        }

        video.delete_existing_subtitles()?;

        let mut extracted = Vec::new();
        for (source, ext) in targets {
            let entry = entries
                .get(&source)
                .ok_or_else(|| Error::MissingEntry(source.clone()))?;
            let path = video.subtitle_path(&ext);
            save(&path, &entry.read()?)?;
            extracted.push(ExtractedSubtitle { source, path });
        }

        Ok(extracted)
    }

    fn process_subtitle(
        &self,
        video: &Video,
        source: &str,
        data: &[u8],
        ext: &str,
    ) -> Result<ExtractedSubtitle, CandidateError> {
        video.delete_existing_subtitles()?;

        let path = video.subtitle_path(ext);
        save(&path, data)?;
        Ok(ExtractedSubtitle {
            source: source.to_string(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_zip;
    use crate::downloader::{Download, Downloader};
    use crate::select::{LanguageTags, SearchResults};
    use tempfile::TempDir;

    const VIDEO: &str = "The.Flash.S01E01.720p.mkv";

    /// Offers the same files for every query and serves them by link.
    struct MockSite {
        files: Vec<(&'static str, Vec<u8>)>,
    }

    impl Downloader for MockSite {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn choice_prefix(&self) -> &'static str {
            "[MOCK]"
        }

        fn search(&self, _query: &str) -> Result<SearchResults, Error> {
            Ok(self
                .files
                .iter()
                .map(|(name, _)| SearchResult {
                    name: format!("[MOCK]{}", name),
                    languages: LanguageTags::empty(),
                    link: name.to_string(),
                    session: None,
                })
                .collect())
        }

        fn download(&self, result: &SearchResult) -> Result<Download, Error> {
            let (name, data) = self
                .files
                .iter()
                .find(|(name, _)| *name == result.link)
                .ok_or_else(|| Error::Download(format!("no such file {}", result.link)))?;
            Ok(Download {
                kind: DownloadKind::from_file_name(name),
                data: data.clone(),
            })
        }
    }

    fn flash_pack() -> Vec<u8> {
        build_zip(&[
            ("subs/", b""),
            ("subs/The.Flash.S01E02.chs.ass", b"wrong episode"),
            ("subs/The.Flash.S01E01.chs.srt", b"srt body"),
            ("subs/The.Flash.S01E01.chs.ass", b"ass body"),
        ])
    }

    fn pipeline(config: Config, files: Vec<(&'static str, Vec<u8>)>) -> Pipeline {
        let mut registry = DownloaderRegistry::new();
        registry.register(MockSite { files });
        Pipeline::new(config, registry)
    }

    fn video(dir: &TempDir, config: &Config) -> Video {
        Video::new(&dir.path().join(VIDEO), None, config.identifier()).unwrap()
    }

    fn extracted(outcome: VideoOutcome) -> Vec<ExtractedSubtitle> {
        match outcome {
            VideoOutcome::Done(extracted) => extracted,
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_extracts_best_entry() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let video = video(&dir, &config);
        let pipeline = pipeline(config, vec![("pack.zip", flash_pack())]);

        let subs = extracted(pipeline.process_video(&video));

        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].source, "subs/The.Flash.S01E01.chs.ass");
        assert_eq!(subs[0].path, dir.path().join("The.Flash.S01E01.720p.ass"));
        assert_eq!(fs::read(&subs[0].path).unwrap(), b"ass body");
    }

    #[test]
    fn test_falls_through_failing_results() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let video = video(&dir, &config);
        let empty = build_zip(&[("readme.txt", b"nothing here")]);
        let pipeline = pipeline(
            config,
            vec![
                ("setup.exe", b"MZ".to_vec()),
                ("empty.zip", empty),
                ("pack.zip", flash_pack()),
            ],
        );

        let subs = extracted(pipeline.process_video(&video));
        assert_eq!(subs[0].source, "subs/The.Flash.S01E01.chs.ass");
    }

    #[test]
    fn test_both_and_plex_identifier() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            both: true,
            plex: true,
            ..Config::default()
        };
        let video = video(&dir, &config);
        let pipeline = pipeline(config, vec![("pack.zip", flash_pack())]);

        let subs = extracted(pipeline.process_video(&video));

        let paths: Vec<&PathBuf> = subs.iter().map(|s| &s.path).collect();
        assert_eq!(
            paths,
            [
                &dir.path().join("The.Flash.S01E01.720p.zh.ass"),
                &dir.path().join("The.Flash.S01E01.720p.zh.srt"),
            ]
        );
        assert_eq!(fs::read(&subs[1].path).unwrap(), b"srt body");
    }

    #[test]
    fn test_more_keeps_archive() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            more: true,
            ..Config::default()
        };
        let video = video(&dir, &config);
        let pack = flash_pack();
        let pipeline = pipeline(config, vec![("pack.zip", pack.clone())]);

        extracted(pipeline.process_video(&video));

        let archive = dir.path().join("[MOCK]pack.zip.zip");
        assert_eq!(fs::read(archive).unwrap(), pack);
    }

    #[test]
    fn test_bare_subtitle_download() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let video = video(&dir, &config);
        let pipeline = pipeline(
            config,
            vec![("The.Flash.S01E01.SRT", b"bare".to_vec())],
        );

        let subs = extracted(pipeline.process_video(&video));
        assert_eq!(subs[0].source, "[MOCK]The.Flash.S01E01.SRT");
        assert_eq!(subs[0].path, dir.path().join("The.Flash.S01E01.720p.srt"));
    }

    #[test]
    fn test_existing_subtitle() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("The.Flash.S01E01.720p.srt");
        fs::write(&old, b"old").unwrap();

        let config = Config::default();
        let video = video(&dir, &config);
        let skipping = pipeline(config, vec![("pack.zip", flash_pack())]);
        assert!(matches!(
            skipping.process_video(&video),
            VideoOutcome::Skipped
        ));
        assert!(old.exists());

        let config = Config {
            over: true,
            ..Config::default()
        };
        let replacing = pipeline(config, vec![("pack.zip", flash_pack())]);
        extracted(replacing.process_video(&video));
        assert!(!old.exists());
        assert!(dir.path().join("The.Flash.S01E01.720p.ass").exists());
    }

    #[test]
    fn test_no_results_and_no_match() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let video = video(&dir, &config);

        let nothing = pipeline(config.clone(), Vec::new());
        assert!(matches!(
            nothing.process_video(&video),
            VideoOutcome::NoResults
        ));

        let wrong = build_zip(&[("The.Flash.S01E02.chs.ass", b"wrong episode")]);
        let mismatched = pipeline(config, vec![("wrong.zip", wrong)]);
        match mismatched.process_video(&video) {
            VideoOutcome::NoMatch(reasons) => {
                assert_eq!(reasons, ["[MOCK]wrong.zip: no guess result in auto mode"]);
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_run_report() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let found = video(&dir, &config);
        let missing = Video::new(&dir.path().join("Arrow.S02E03.mkv"), None, "").unwrap();

        let pipeline = pipeline(config, vec![("pack.zip", flash_pack())]);
        let mut seen = Vec::new();
        let report = pipeline.run_with(&[found, missing], |video, outcome| {
            seen.push((video.name.clone(), outcome.is_success()));
        });

        assert_eq!(
            seen,
            [
                ("The.Flash.S01E01.720p".to_string(), true),
                ("Arrow.S02E03".to_string(), false),
            ]
        );
        assert_eq!(report.total, 2);
        assert_eq!(report.success, 1);
        assert_eq!(report.fail, 1);
        assert_eq!(report.failed[0].name, "Arrow.S02E03");
        assert!(report.failed[0].error.starts_with("failed to guess one subtitle"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fail"], 1);
    }
}
