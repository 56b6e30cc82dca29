use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use super::{run_tool, ArchiveKind, ArchiveReader};
use crate::Error;

/// Shared by RAR 4 (`Rar!\x1A\x07\x00`) and RAR 5 (`Rar!\x1A\x07\x01\x00`).
const SIGNATURE: &[u8] = b"Rar!\x1A\x07";
const TOOL: &str = "unrar";

/// RAR archive read through the `unrar` command line tool.
pub struct RarReader {
    _dir: TempDir,
    path: PathBuf,
    names: Vec<String>,
}

impl RarReader {
    pub fn open(data: &[u8]) -> Result<Self, Error> {
        if !data.starts_with(SIGNATURE) {
            return Err(Error::MalformedArchive {
                kind: ArchiveKind::Rar,
                reason: "bad signature".to_string(),
            });
        }

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("archive.rar");
        fs::write(&path, data)?;

        let listing = run_tool(
            TOOL,
            ArchiveKind::Rar,
            [OsStr::new("lt"), OsStr::new("--"), path.as_os_str()],
        )?;
        let names = parse_technical_listing(&String::from_utf8_lossy(&listing));

        Ok(Self {
            _dir: dir,
            path,
            names,
        })
    }
}

impl ArchiveReader for RarReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Rar
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
            ArchiveKind::Rar,
            [
                OsStr::new("p"),
                OsStr::new("-inul"),
                OsStr::new("--"),
                self.path.as_os_str(),
                OsStr::new(name),
            ],
        )
    }
}

/// Parse `unrar lt` output. Each entry starts with a `Name:` line; a
/// `Type: Directory` line marks folders, which get a trailing `/`.
fn parse_technical_listing(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut current_is_dir = false;

    for line in output.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("Name: ") {
            if current_is_dir {
                if let Some(last) = names.last_mut() {
                    last.push('/');
                }
            }
            names.push(name.replace('\\', "/"));
            current_is_dir = false;
        } else if let Some(kind) = line.strip_prefix("Type: ") {
            current_is_dir = kind == "Directory";
        }
    }
    if current_is_dir {
        if let Some(last) = names.last_mut() {
            last.push('/');
        }
    }

    names
}
