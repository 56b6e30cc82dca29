//! getsub - subtitle matching and selection
//!
//! Locates the subtitle that best matches a video file. The video name is
//! parsed into a [`VideoDescriptor`], turned into ordered search keywords,
//! and every candidate subtitle (search result or archive entry) is scored
//! against it.
//!
//! # Architecture
//!
//! 1. [`name`] cleans mixed-language file names
//! 2. [`guess`] parses release names into structured metadata
//! 3. [`keywords`] builds the narrowing search query
//! 4. [`score`] and [`select`] rank candidates
//! 5. [`archive`] walks (nested) zip / rar / 7z archives
//! 6. [`video`] finds the videos to work on
//! 7. [`pipeline`] ties it together with the [`downloader`] sites
//!
//! # Example
//!
//! ```
//! use getsub::{guess, pick_best};
//!
//! let video = guess("The.Walking.Dead.S10E01.1080p.WEB.H264-TBS.mkv");
//! let entries = [
//!     "the.walking.dead.s10e02.chs.srt",
//!     "the.walking.dead.s10e01.chs.eng.ass",
//! ];
//!
//! let selection = pick_best(&entries, &video);
//! assert!(selection.success);
//! assert_eq!(selection.chosen.as_deref(), Some("the.walking.dead.s10e01.chs.eng.ass"));
//! ```

pub use error::Error;

// Archive listing and reading
pub mod archive;

pub mod config;

// Subtitle sites
pub mod downloader;

// Release name parsing
pub mod guess;

pub mod keywords;

// Mixed-language name cleanup
pub mod name;

pub mod pipeline;

pub mod score;

pub mod select;

pub mod video;


pub use archive::{list_subtitle_entries, ArchiveKind, SubtitleEntries};
pub use guess::{guess, MediaKind, VideoDescriptor};
pub use keywords::{build_keywords, Keywords};
pub use name::extract_dominant_language;
pub use score::{score, MatchScore};
pub use select::{
    pick_best, rank_search_results, LanguageTags, SearchResult, SearchResults, Selection,
};

mod error {
    use thiserror::Error;

    use crate::archive::ArchiveKind;

    #[derive(Debug, Error)]
    pub enum Error {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Zip error: {0}")]
        Zip(#[from] zip::result::ZipError),

        /// Bad signature or corrupt data, fatal for that archive only.
        #[error("Malformed {kind} archive: {reason}")]
        MalformedArchive { kind: ArchiveKind, reason: String },

        #[error("No entry named '{0}' in archive")]
        MissingEntry(String),

        #[error("{tool} not found. Please install it and ensure it's in your PATH.")]
        ToolMissing { tool: &'static str },

        #[error("unsupported file type {0}")]
        UnsupportedFormat(String),

        #[error("Config error: {0}")]
        Config(String),

        #[error("Download error: {0}")]
        Download(String),

        #[error("No such downloader: {name}. Please choose from: {available}")]
        UnknownDownloader { name: String, available: String },
    }
}

/// Subtitle extensions that can be chosen.
pub const SUB_FORMATS: [&str; 4] = [".ass", ".srt", ".ssa", ".sub"];

/// Archive extensions that are opened and walked.
pub const ARCHIVE_TYPES: [&str; 3] = [".zip", ".rar", ".7z"];

/// Video extensions picked up when scanning directories.
pub const VIDEO_FORMATS: [&str; 16] = [
    ".mkv", ".mp4", ".avi", ".rmvb", ".rm", ".wmv", ".mov", ".flv", ".ts", ".m2ts", ".webm",
    ".m4v", ".mpg", ".mpeg", ".iso", ".3gp",
];

const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Split `name` into `(stem, extension)`.
///
/// The extension keeps its leading dot. Leading dots of the final path
/// component never start an extension, so `".hidden"` has none, and a name
/// ending in a path separator has none either.
pub fn split_extension(name: &str) -> (&str, &str) {
    let base_start = name.rfind(PATH_SEPARATORS).map(|i| i + 1).unwrap_or(0);
    let base = &name[base_start..];

    match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => {
            let split = base_start + dot;
            (&name[..split], &name[split..])
        }
        _ => (name, ""),
    }
}

/// Final path component of an archive entry or file path.
pub fn file_name(path: &str) -> &str {
    path.rsplit(PATH_SEPARATORS).next().unwrap_or(path)
}

/// Directory markers inside archives end with a separator.
pub fn is_directory_entry(path: &str) -> bool {
    path.ends_with('/') || path.ends_with('\\')
}

fn has_extension_in(name: &str, set: &[&str]) -> bool {
    let ext = split_extension(name).1.to_lowercase();
    !ext.is_empty() && set.contains(&ext.as_str())
}

pub fn is_subtitle_file(name: &str) -> bool {
    has_extension_in(name, &SUB_FORMATS)
}

pub fn is_archive_file(name: &str) -> bool {
    has_extension_in(name, &ARCHIVE_TYPES)
}

pub fn is_video_file(name: &str) -> bool {
    has_extension_in(name, &VIDEO_FORMATS)
}
