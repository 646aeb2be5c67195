//! Frame sequences decoded upstream and stored as image files.

use std::path::{Path, PathBuf};

use image::RgbImage;
use teamlock_media::{FrameSource, MediaError, MediaResult};
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A directory of frame images, ordered by file name.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
}

impl ImageSequence {
    /// Index every frame image in `dir`. Other files are ignored.
    pub fn open(dir: &Path) -> WorkerResult<Self> {
        if !dir.is_dir() {
            return Err(WorkerError::InputNotFound(dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_frame_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        debug!(dir = %dir.display(), frames = paths.len(), "Indexed frame directory");
        Ok(Self { paths })
    }

    /// Frame file paths, in frame order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn is_frame_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.as_str()))
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn frame(&self, index: usize) -> MediaResult<RgbImage> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| MediaError::frame_read(index, "index out of range"))?;
        image::open(path)
            .map(|img| img.to_rgb8())
            .map_err(|e| MediaError::frame_read(index, format!("{}: {e}", path.display())))
    }
}
