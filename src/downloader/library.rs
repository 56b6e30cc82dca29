//! Local subtitle library.
//!
//! Serves subtitle archives and bare subtitles from a directory tree, e.g. a
//! collection of previously downloaded packs. A file matches a query when
//! every keyword occurs in its name, ignoring case and `.`/`_`/`-`
//! separators.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Download, DownloadKind, Downloader};
use crate::select::{LanguageTags, SearchResult, SearchResults};
use crate::{is_archive_file, is_subtitle_file, Error};

pub struct LibraryDownloader {
    root: PathBuf,
}

impl LibraryDownloader {
    pub const NAME: &'static str = "library";
    pub const CHOICE_PREFIX: &'static str = "[LIBRARY]";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archives and subtitles under the root, sorted by path.
    fn files(&self) -> Result<Vec<PathBuf>, Error> {
        if !self.root.is_dir() {
            return Err(Error::Download(format!(
                "library directory not found: {}",
                self.root.display()
            )));
        }

        let mut files = Vec::new();
        collect_files_recursive(&self.root, &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn collect_files_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let entry_path = entry.path();

        if file_type.is_file() {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_archive_file(&name) || is_subtitle_file(&name) {
                files.push(entry_path);
            }
        } else if file_type.is_dir() {
            collect_files_recursive(&entry_path, files)?;
        }
    }
    Ok(())
}

/// Lowercase with `.`, `_` and `-` turned into spaces.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect()
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|term| match urlencoding::decode(term) {
            Ok(decoded) => normalize(&decoded),
            Err(_) => normalize(term),
        })
        .filter(|term| !term.trim().is_empty())
        .collect()
}

impl Downloader for LibraryDownloader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn choice_prefix(&self) -> &'static str {
        Self::CHOICE_PREFIX
    }

    fn search(&self, query: &str) -> Result<SearchResults, Error> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for path in self.files()? {
            let file_name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let haystack = normalize(&file_name);

            if terms.iter().all(|term| haystack.contains(term.as_str())) {
                results.push(SearchResult {
                    name: format!("{}{}", Self::CHOICE_PREFIX, file_name),
                    languages: LanguageTags::from_text(&file_name),
                    link: path.to_string_lossy().to_string(),
                    session: None,
                });
            }
        }

        debug!(query, found = results.len(), "library search");
        Ok(results)
    }

    fn download(&self, result: &SearchResult) -> Result<Download, Error> {
        let path = Path::new(&result.link).canonicalize()?;
        if !path.starts_with(self.root.canonicalize()?) {
            return Err(Error::Download(format!(
                "{} is outside the library",
                path.display()
            )));
        }

        let data = fs::read(&path)?;
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();

        Ok(Download {
            kind: DownloadKind::from_file_name(&file_name),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveKind;
    use tempfile::TempDir;

    fn library() -> (TempDir, LibraryDownloader) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("flash/season1")).unwrap();
        fs::write(root.join("flash/season1/The.Flash.S01E01.chs&eng.zip"), b"zip").unwrap();
        fs::write(root.join("flash/season1/The.Flash.S01E02.cht.srt"), b"srt").unwrap();
        fs::write(root.join("flash/notes.txt"), b"ignored").unwrap();
        fs::write(root.join("Arrow.S01E01.rar"), b"rar").unwrap();
        let downloader = LibraryDownloader::new(root);
        (dir, downloader)
    }

    fn names(results: &SearchResults) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("The%20Flash s01 e01"), ["the flash", "s01", "e01"]);
        assert!(query_terms("   ").is_empty());
    }

    #[test]
    fn test_search_requires_every_term() {
        let (_dir, library) = library();

        let results = library.search("The%20Flash s01").unwrap();
        assert_eq!(
            names(&results),
            [
                "[LIBRARY]The.Flash.S01E01.chs&eng.zip",
                "[LIBRARY]The.Flash.S01E02.cht.srt"
            ]
        );
        assert!(results[0].languages.contains(LanguageTags::DUAL));
        assert_eq!(results[1].languages, LanguageTags::TRADITIONAL);

        let results = library.search("The%20Flash s01 e02").unwrap();
        assert_eq!(names(&results), ["[LIBRARY]The.Flash.S01E02.cht.srt"]);

        assert!(library.search("The%20Flash s02").unwrap().is_empty());
        assert!(library.search("notes").unwrap().is_empty());
    }

    #[test]
    fn test_download() {
        let (_dir, library) = library();
        let results = library.search("Arrow").unwrap();

        let download = library.download(&results[0]).unwrap();
        assert_eq!(download.kind, DownloadKind::Archive(ArchiveKind::Rar));
        assert_eq!(download.data, b"rar");
    }

    #[test]
    fn test_download_outside_library() {
        let (_dir, library) = library();
        let result = SearchResult {
            name: "[LIBRARY]passwd".to_string(),
            languages: LanguageTags::empty(),
            link: "/etc/passwd".to_string(),
            session: None,
        };
        assert!(matches!(library.download(&result), Err(Error::Download(_))));
    }

    #[test]
    fn test_download_escaping_library() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("subs")).unwrap();
        fs::write(dir.path().join("secret.srt"), b"secret").unwrap();
        let library = LibraryDownloader::new(dir.path().join("subs"));

        let link = dir.path().join("subs/../secret.srt");
        let result = SearchResult {
            name: "[LIBRARY]secret.srt".to_string(),
            languages: LanguageTags::empty(),
            link: link.to_string_lossy().to_string(),
            session: None,
        };
        assert!(matches!(library.download(&result), Err(Error::Download(_))));
    }

    #[test]
    fn test_missing_root() {
        let library = LibraryDownloader::new("/nonexistent/library");
        assert!(matches!(library.search("x"), Err(Error::Download(_))));
    }
}
