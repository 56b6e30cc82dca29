use std::io::{Cursor, Read};
use std::sync::Arc;

use ::zip::ZipArchive;

use super::{ArchiveKind, ArchiveReader};
use crate::name::repair_legacy_name;
use crate::Error;

/// In-memory zip archive.
///
/// Entry names written without the UTF-8 flag are decoded as GBK when
/// possible, which is what Chinese archiving tools produce.
pub struct ZipReader {
    data: Arc<[u8]>,
    names: Vec<String>,
}

/// Upper bound on the buffer preallocated for an entry.
const MAX_SIZE_HINT: u64 = 16 * 1024 * 1024;

/// Declared entry sizes come from the archive and are not trusted.
fn size_hint(declared: u64) -> usize {
    declared.min(MAX_SIZE_HINT) as usize
}

fn malformed(e: ::zip::result::ZipError) -> Error {
    Error::MalformedArchive {
        kind: ArchiveKind::Zip,
        reason: e.to_string(),
    }
}

impl ZipReader {
    pub fn open(data: Arc<[u8]>) -> Result<Self, Error> {
        let names = {
            let mut archive = ZipArchive::new(Cursor::new(&data[..])).map_err(malformed)?;
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let entry = archive.by_index_raw(i).map_err(malformed)?;
                let name = repair_legacy_name(entry.name_raw())
                    .unwrap_or_else(|| entry.name().to_string());
                names.push(name);
            }
            names
        };

        Ok(Self { data, names })
    }
}

impl ArchiveReader for ZipReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn list_names(&self) -> &[String] {
        &self.names
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::MissingEntry(name.to_string()))?;

        let mut archive = ZipArchive::new(Cursor::new(&self.data[..]))?;
        let mut entry = archive.by_index(index)?;
        let mut buf = Vec::with_capacity(size_hint(entry.size()));
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Build an uncompressed zip in memory. Names ending in `/` become
/// directory entries.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;

    use ::zip::write::SimpleFileOptions;
    use ::zip::{CompressionMethod, ZipWriter};

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_read() {
        let data = build_zip(&[("subs/", b""), ("subs/a.srt", b"hello")]);
        let reader = ZipReader::open(Arc::from(data.as_slice())).unwrap();

        assert_eq!(reader.list_names(), ["subs/", "subs/a.srt"]);
        assert_eq!(reader.read("subs/a.srt").unwrap(), b"hello");
    }

    #[test]
    fn test_size_hint_is_capped() {
        assert_eq!(size_hint(0), 0);
        assert_eq!(size_hint(4096), 4096);
        assert_eq!(size_hint(u64::MAX), MAX_SIZE_HINT as usize);
    }

    #[test]
    fn test_read_missing_entry() {
        let data = build_zip(&[("a.srt", b"hello")]);
        let reader = ZipReader::open(Arc::from(data.as_slice())).unwrap();

        let err = reader.read("b.srt").unwrap_err();
        assert!(matches!(err, Error::MissingEntry(name) if name == "b.srt"));
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let err = ZipReader::open(Arc::from(&b"Rar!\x1a\x07\x00"[..])).err().unwrap();
        assert!(matches!(
            err,
            Error::MalformedArchive {
                kind: ArchiveKind::Zip,
                ..
            }
        ));
    }
}
