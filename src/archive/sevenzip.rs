use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use super::{run_tool, ArchiveKind, ArchiveReader};
use crate::Error;

const SIGNATURE: &[u8] = b"7z\xBC\xAF\x27\x1C";
const TOOL: &str = "7z";

/// 7z archive read through the `7z` command line tool.
///
/// The archive bytes are written to a private temporary directory that lives
/// as long as the reader.
pub struct SevenZipReader {
    _dir: TempDir,
    path: PathBuf,
    names: Vec<String>,
}

impl SevenZipReader {
    pub fn open(data: &[u8]) -> Result<Self, Error> {
        if !data.starts_with(SIGNATURE) {
            return Err(Error::MalformedArchive {
                kind: ArchiveKind::SevenZip,
                reason: "bad signature".to_string(),
            });
        }

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("archive.7z");
        fs::write(&path, data)?;

        let listing = run_tool(
            TOOL,
            ArchiveKind::SevenZip,
            [OsStr::new("l"), OsStr::new("-slt"), OsStr::new("--"), path.as_os_str()],
        )?;
        let names = parse_slt_listing(&String::from_utf8_lossy(&listing));

        Ok(Self {
            _dir: dir,
            path,
            names,
        })
    }
}

impl ArchiveReader for SevenZipReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn list_names(&self) -> &[String] {
        &self.names
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
        if !self.names.iter().any(|n| n == name) {
            return Err(Error::MissingEntry(name.to_string()));
        }

        run_tool(
            TOOL,
            ArchiveKind::SevenZip,
            [
                OsStr::new("e"),
                OsStr::new("-so"),
                OsStr::new("-spd"),
                OsStr::new("--"),
                self.path.as_os_str(),
                OsStr::new(name),
            ],
        )
    }
}

/// Parse `7z l -slt` output into entry names. Folders get a trailing `/`.
fn parse_slt_listing(output: &str) -> Vec<String> {
    let Some((_, body)) = output.split_once("\n----------") else {
        return Vec::new();
    };

    let mut names = Vec::new();
    let mut path: Option<&str> = None;
    let mut is_dir = false;

    let mut flush = |path: &mut Option<&str>, is_dir: &mut bool| {
        if let Some(p) = path.take() {
            let name = p.replace('\\', "/");
            if *is_dir {
                names.push(format!("{}/", name.trim_end_matches('/')));
            } else {
                names.push(name);
            }
        }
        *is_dir = false;
    };

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            flush(&mut path, &mut is_dir);
            continue;
        }

        let Some((key, value)) = line.split_once(" = ") else {
            continue;
        };
        match key {
            "Path" => {
                flush(&mut path, &mut is_dir);
                path = Some(value);
            }
            "Folder" => is_dir |= value == "+",
            "Attributes" => is_dir |= value.starts_with('D'),
            _ => {}
        }
    }
    flush(&mut path, &mut is_dir);

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
7-Zip [64] 16.02 : Copyright (c) 1999-2016 Igor Pavlov : 2016-05-21

Scanning the drive for archives:
1 file, 1024 bytes (1 KiB)

Listing archive: /tmp/x/archive.7z

--
Path = /tmp/x/archive.7z
Type = 7z
Physical Size = 1024
Headers Size = 200
Method = LZMA2:12
Solid = +
Blocks = 1

----------
Path = dir3/sub.srt
Size = 3
Packed Size = 12
Modified = 2020-01-01 00:00:00
Attributes = A_ -rw-r--r--

Path = dir3/dir4
Size = 0
Packed Size = 0
Modified = 2020-01-01 00:00:00
Attributes = D_ drwxr-xr-x

Path = archive\\sub4.sub
Size = 4
Folder = -
Attributes = A

Path = dir3
Folder = +
Size = 0
";

    #[test]
    fn test_parse_slt_listing() {
        assert_eq!(
            parse_slt_listing(LISTING),
            ["dir3/sub.srt", "dir3/dir4/", "archive/sub4.sub", "dir3/"]
        );
    }

    #[test]
    fn test_parse_listing_without_entries() {
        assert!(parse_slt_listing("7-Zip\n\nError: cannot open file").is_empty());
    }

    #[test]
    fn test_open_checks_signature() {
        let err = SevenZipReader::open(b"PK\x03\x04").err().unwrap();
        assert!(matches!(
            err,
            Error::MalformedArchive {
                kind: ArchiveKind::SevenZip,
                ..
            }
        ));
    }
}
