//! Downloader trait and download payloads.

use crate::archive::ArchiveKind;
use crate::select::{SearchResult, SearchResults};
use crate::{is_archive_file, is_subtitle_file, split_extension, Error};

/// What a download turned out to be, judged by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadKind {
    Archive(ArchiveKind),
    /// Bare subtitle file, with its lowercase extension (e.g. `.srt`).
    Subtitle(String),
    Unknown(String),
}

impl DownloadKind {
    pub fn from_file_name(name: &str) -> Self {
        let ext = split_extension(name).1.to_lowercase();
        if is_archive_file(name) {
            if let Some(kind) = ArchiveKind::from_extension(&ext) {
                return DownloadKind::Archive(kind);
            }
        }
        if is_subtitle_file(name) {
            return DownloadKind::Subtitle(ext);
        }
        DownloadKind::Unknown(ext)
    }

    /// Extension including the leading dot, empty when unknown.
    pub fn extension(&self) -> &str {
        match self {
            DownloadKind::Archive(kind) => kind.extension(),
            DownloadKind::Subtitle(ext) | DownloadKind::Unknown(ext) => ext,
        }
    }
}

/// A downloaded archive or subtitle.
#[derive(Debug, Clone)]
pub struct Download {
    pub kind: DownloadKind,
    pub data: Vec<u8>,
}

/// A subtitle source.
///
/// `search` runs a single query; the keyword narrowing loop lives in
/// [`search_site`](super::search_site). Result names must start with the
/// site's choice prefix so a chosen result can be routed back to the site
/// that produced it.
pub trait Downloader: Send + Sync {
    /// Site id used on the command line and in config (e.g. `library`).
    fn name(&self) -> &'static str;

    /// Bracketed tag prepended to result names (e.g. `[LIBRARY]`).
    fn choice_prefix(&self) -> &'static str;

    /// Search with a space-joined, URL-encoded keyword query.
    fn search(&self, query: &str) -> Result<SearchResults, Error>;

    fn download(&self, result: &SearchResult) -> Result<Download, Error>;
}
