//! Videos to find subtitles for.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::guess::{guess, VideoDescriptor};
use crate::name::extract_dominant_language;
use crate::{is_video_file, split_extension, Error, SUB_FORMATS};

#[derive(Debug, Clone)]
pub struct Video {
    /// File name without extension.
    pub name: String,
    /// Extension with its leading dot, e.g. `.mkv`.
    pub extension: String,
    /// Absolute directory of the video.
    pub dir: PathBuf,
    /// Absolute directory extracted subtitles are written to.
    pub store_path: PathBuf,
    /// Inserted between the name and the subtitle extension (`.zh` for Plex).
    pub identifier: String,
    /// A subtitle for this video already exists in the store path.
    pub has_subtitle: bool,
    pub descriptor: VideoDescriptor,
}

fn absolute(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

impl Video {
    /// `store_path` defaults to the video's own directory.
    pub fn new(path: &Path, store_path: Option<&Path>, identifier: &str) -> Result<Self, Error> {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let (name, extension) = split_extension(&file_name);

        let dir = absolute(path.parent().unwrap_or_else(|| Path::new("")))?;
        let store_path = match store_path {
            Some(store) => absolute(store)?,
            None => dir.clone(),
        };

        let descriptor = guess(&extract_dominant_language(&file_name, false));

        let mut video = Self {
            name: name.to_string(),
            extension: extension.to_string(),
            dir,
            store_path,
            identifier: identifier.to_string(),
            has_subtitle: false,
            descriptor,
        };
        let has_subtitle = video.existing_subtitles().next().is_some();
        video.has_subtitle = has_subtitle;
        Ok(video)
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }

    /// Where a subtitle with extension `ext` for this video is stored.
    pub fn subtitle_path(&self, ext: &str) -> PathBuf {
        self.store_path
            .join(format!("{}{}{}", self.name, self.identifier, ext))
    }

    fn existing_subtitles(&self) -> impl Iterator<Item = PathBuf> + '_ {
        SUB_FORMATS
            .iter()
            .map(|ext| self.subtitle_path(ext))
            .filter(|path| path.exists())
    }

    /// Remove every subtitle previously stored for this video.
    pub fn delete_existing_subtitles(&self) -> Result<(), Error> {
        for path in self.existing_subtitles() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn collect_videos_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_file() {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_video_file(&name) {
                files.push(entry.path());
            }
        } else if file_type.is_dir() {
            collect_videos_recursive(&entry.path(), files)?;
        }
    }
    Ok(())
}

/// Resolve a command line argument into videos.
///
/// - a directory is walked for video files, sorted by path
/// - an absolute path is a single video if it has a video extension
/// - anything else is a bare video name, stored in the current directory
///   unless `store_path` is given
pub fn collect_videos(
    raw_path: &str,
    store_path: Option<&Path>,
    identifier: &str,
) -> Result<Vec<Video>, Error> {
    let raw_path = raw_path.replace('"', "");
    let path = Path::new(&raw_path);

    if path.is_dir() {
        let mut files = Vec::new();
        collect_videos_recursive(path, &mut files)?;
        files.sort();
        return files
            .iter()
            .map(|file| Video::new(file, store_path, identifier))
            .collect();
    }

    if path.is_absolute() {
        if !is_video_file(&raw_path) {
            return Ok(Vec::new());
        }
        return Ok(vec![Video::new(path, store_path, identifier)?]);
    }

    let store = match store_path {
        Some(store) => store.to_path_buf(),
        None => env::current_dir()?,
    };
    Ok(vec![Video::new(path, Some(&store), identifier)?])
}
