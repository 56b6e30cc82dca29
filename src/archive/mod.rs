//! Subtitle archives.
//!
//! Sites hand out zip, rar and 7z archives, sometimes nested and often with
//! the wrong extension. [`list_subtitle_entries`] opens an archive with an
//! ordered fallback chain of readers and walks it recursively, keeping a
//! handle to the reader that owns each subtitle entry.

mod rar;
mod sevenzip;
mod zip;

use std::ffi::OsStr;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::{is_archive_file, is_directory_entry, is_subtitle_file, split_extension, Error};

pub use self::rar::RarReader;
pub use self::sevenzip::SevenZipReader;
pub use self::zip::ZipReader;

#[cfg(test)]
pub(crate) use self::zip::build_zip;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Zip,
    Rar,
    SevenZip,
}

impl ArchiveKind {
    /// Look up a format by extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "rar" => Some(ArchiveKind::Rar),
            "7z" => Some(ArchiveKind::SevenZip),
            _ => None,
        }
    }

    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::Rar => ".rar",
            ArchiveKind::SevenZip => ".7z",
        }
    }

    /// Readers to try, in order, for data labelled as this kind.
    pub fn fallback_chain(self) -> &'static [ArchiveKind] {
        match self {
            ArchiveKind::SevenZip => &[ArchiveKind::SevenZip, ArchiveKind::Zip, ArchiveKind::Rar],
            ArchiveKind::Zip => &[ArchiveKind::Zip, ArchiveKind::Rar],
            ArchiveKind::Rar => &[ArchiveKind::Rar],
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Rar => "rar",
            ArchiveKind::SevenZip => "7z",
        };
        write!(f, "{}", name)
    }
}

/// An opened archive.
///
/// Implementations must be `Send + Sync` so entries can outlive the walk
/// that produced them.
pub trait ArchiveReader: Send + Sync {
    fn kind(&self) -> ArchiveKind;

    /// Every entry name, directories included (with a trailing `/`).
    fn list_names(&self) -> &[String];

    fn read(&self, name: &str) -> Result<Vec<u8>, Error>;
}

/// The reader that ultimately opened an archive.
pub struct OpenedArchive {
    /// May differ from the requested kind when a fallback reader succeeded.
    pub kind: ArchiveKind,
    pub reader: Arc<dyn ArchiveReader>,
}

fn open_with(kind: ArchiveKind, data: Arc<[u8]>) -> Result<Arc<dyn ArchiveReader>, Error> {
    let reader: Arc<dyn ArchiveReader> = match kind {
        ArchiveKind::Zip => Arc::new(ZipReader::open(data)?),
        ArchiveKind::Rar => Arc::new(RarReader::open(&data)?),
        ArchiveKind::SevenZip => Arc::new(SevenZipReader::open(&data)?),
    };
    Ok(reader)
}

/// Open `data` labelled as `kind`, trying each reader of the kind's
/// fallback chain in turn. Returns the last reader's error if none works.
pub fn open_archive(data: Arc<[u8]>, kind: ArchiveKind) -> Result<OpenedArchive, Error> {
    let mut last_error = None;

    for &candidate in kind.fallback_chain() {
        match open_with(candidate, Arc::clone(&data)) {
            Ok(reader) => {
                if candidate != kind {
                    debug!(declared = %kind, actual = %candidate, "opened archive with fallback reader");
                }
                return Ok(OpenedArchive {
                    kind: candidate,
                    reader,
                });
            }
            Err(e) => {
                debug!(kind = %candidate, error = %e, "archive reader failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::MalformedArchive {
        kind,
        reason: "no reader available".to_string(),
    }))
}

/// A subtitle file inside a (possibly nested) archive.
#[derive(Clone)]
pub struct SubtitleEntry {
    pub path: String,
    reader: Arc<dyn ArchiveReader>,
}

impl SubtitleEntry {
    pub fn read(&self) -> Result<Vec<u8>, Error> {
        self.reader.read(&self.path)
    }

    /// Format of the archive that directly contains this entry.
    pub fn kind(&self) -> ArchiveKind {
        self.reader.kind()
    }
}

impl fmt::Debug for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtitleEntry")
            .field("path", &self.path)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Subtitle entries in walk order. Paths are unique: a nested archive
/// entry with an already-seen path replaces the earlier one in place.
#[derive(Debug, Clone, Default)]
pub struct SubtitleEntries {
    entries: Vec<SubtitleEntry>,
}

impl SubtitleEntries {
    pub fn insert(&mut self, path: &str, reader: Arc<dyn ArchiveReader>) {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(existing) => existing.reader = reader,
            None => self.entries.push(SubtitleEntry {
                path: path.to_string(),
                reader,
            }),
        }
    }

    pub fn get(&self, path: &str) -> Option<&SubtitleEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubtitleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// List every subtitle inside an archive, descending into nested archives.
///
/// Directory entries are skipped. Errors from any reader in the walk,
/// including nested ones, are returned unchanged.
pub fn list_subtitle_entries(data: &[u8], kind: ArchiveKind) -> Result<SubtitleEntries, Error> {
    let mut entries = SubtitleEntries::default();
    collect_entries(Arc::from(data), kind, &mut entries)?;
    Ok(entries)
}

fn collect_entries(
    data: Arc<[u8]>,
    kind: ArchiveKind,
    entries: &mut SubtitleEntries,
) -> Result<(), Error> {
    let opened = open_archive(data, kind)?;

    for name in opened.reader.list_names() {
        if is_directory_entry(name) {
            continue;
        }

        if is_subtitle_file(name) {
            entries.insert(name, Arc::clone(&opened.reader));
            continue;
        }

        if is_archive_file(name) {
            let Some(nested_kind) = ArchiveKind::from_extension(split_extension(name).1) else {
                continue;
            };
            debug!(entry = %name, kind = %nested_kind, "descending into nested archive");
            let nested = opened.reader.read(name)?;
            collect_entries(Arc::from(nested), nested_kind, entries)?;
        }
    }

    Ok(())
}

/// Run an external archive tool and return its stdout.
pub(crate) fn run_tool<I, S>(tool: &'static str, kind: ArchiveKind, args: I) -> Result<Vec<u8>, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = match Command::new(tool).args(args).output() {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ToolMissing { tool });
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::MalformedArchive {
            kind,
            reason: format!("{} failed: {}", tool, stderr.trim()),
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubReader {
        kind: ArchiveKind,
        names: Vec<String>,
    }

    impl ArchiveReader for StubReader {
        fn kind(&self) -> ArchiveKind {
            self.kind
        }

        fn list_names(&self) -> &[String] {
            &self.names
        }

        fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
            Ok(format!("{}:{}", self.kind, name).into_bytes())
        }
    }

    fn stub(kind: ArchiveKind) -> Arc<dyn ArchiveReader> {
        Arc::new(StubReader {
            kind,
            names: Vec::new(),
        })
    }

    fn nested_fixture() -> Vec<u8> {
        let inner = build_zip(&[
            ("dir1/", b""),
            ("dir1/sub1.ass", b"inner one"),
            ("dir2/sub2.ass", b"inner two"),
        ]);
        build_zip(&[
            ("archive/", b""),
            ("archive/sub4.sub", b"four"),
            ("archive/inner.zip", &inner),
            ("dir3/", b""),
            ("dir3/sub.srt", b"srt"),
            ("dir3/dir4/sub.ass", b"ass"),
            ("readme.txt", b"not a subtitle"),
        ])
    }

    #[test]
    fn test_archive_kind_from_extension() {
        assert_eq!(ArchiveKind::from_extension(".zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("RAR"), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_extension(".7z"), Some(ArchiveKind::SevenZip));
        assert_eq!(ArchiveKind::from_extension(".tar"), None);
        assert_eq!(ArchiveKind::SevenZip.to_string(), "7z");
    }

    #[test]
    fn test_fallback_chain_order() {
        assert_eq!(
            ArchiveKind::SevenZip.fallback_chain(),
            [ArchiveKind::SevenZip, ArchiveKind::Zip, ArchiveKind::Rar]
        );
        assert_eq!(ArchiveKind::Rar.fallback_chain(), [ArchiveKind::Rar]);
    }

    #[test]
    fn test_nested_archive_walk() {
        let entries = list_subtitle_entries(&nested_fixture(), ArchiveKind::Zip).unwrap();

        assert_eq!(
            entries.names(),
            [
                "archive/sub4.sub",
                "dir1/sub1.ass",
                "dir2/sub2.ass",
                "dir3/sub.srt",
                "dir3/dir4/sub.ass",
            ]
        );
        let inner = entries.get("dir1/sub1.ass").unwrap();
        assert_eq!(inner.read().unwrap(), b"inner one");
        assert_eq!(inner.kind(), ArchiveKind::Zip);
        assert_eq!(entries.get("dir3/sub.srt").unwrap().read().unwrap(), b"srt");
    }

    #[test]
    fn test_mislabelled_7z_falls_back_to_zip() {
        let data = build_zip(&[("a.srt", b"1")]);
        let opened = open_archive(Arc::from(data.as_slice()), ArchiveKind::SevenZip).unwrap();
        assert_eq!(opened.kind, ArchiveKind::Zip);

        let entries = list_subtitle_entries(&data, ArchiveKind::SevenZip).unwrap();
        assert_eq!(entries.names(), ["a.srt"]);
    }

    #[test]
    fn test_zip_labelled_rar_has_no_fallback() {
        let data = build_zip(&[("a.srt", b"1")]);
        let err = list_subtitle_entries(&data, ArchiveKind::Rar).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedArchive {
                kind: ArchiveKind::Rar,
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = list_subtitle_entries(b"definitely not an archive", ArchiveKind::Zip).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive { .. }));
    }

    #[test]
    fn test_archive_without_subtitles() {
        let data = build_zip(&[("docs/", b""), ("docs/readme.txt", b"hi")]);
        let entries = list_subtitle_entries(&data, ArchiveKind::Zip).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut entries = SubtitleEntries::default();
        entries.insert("a.srt", stub(ArchiveKind::Zip));
        entries.insert("b.srt", stub(ArchiveKind::Zip));
        entries.insert("a.srt", stub(ArchiveKind::Rar));

        assert_eq!(entries.names(), ["a.srt", "b.srt"]);
        assert_eq!(entries.get("a.srt").unwrap().kind(), ArchiveKind::Rar);
        assert_eq!(entries.get("a.srt").unwrap().read().unwrap(), b"rar:a.srt");
    }
}
