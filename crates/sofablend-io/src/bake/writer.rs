//! Writing bake directories.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use super::paths::{frame_file_name, SCENE_FILE};
use crate::error::{Error, Result};
use crate::schema::{FramePayload, SourceNode};

/// Writes the manifest and frame files of one bake directory.
///
/// Every file is written to a temporary file in the same directory and
/// then renamed into place, so readers only ever see complete files.
#[derive(Debug, Clone)]
pub struct BakeWriter {
    dir: PathBuf,
}

impl BakeWriter {
    /// Start a fresh bake: any existing directory is wiped first.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write into an existing bake directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `scene.json`.
    pub fn write_manifest(&self, manifest: &SourceNode) -> Result<PathBuf> {
        let bytes = serde_json::to_vec(manifest)?;
        self.write_atomic(SCENE_FILE, &bytes)
    }

    /// Write one object's frame file. The payload must carry its frame number.
    pub fn write_frame(&self, object_path: &str, payload: &FramePayload) -> Result<PathBuf> {
        let frame = payload
            .frame
            .ok_or_else(|| Error::MissingRequired("frame".into()))?;
        let bytes = serde_json::to_vec(payload)?;
        self.write_atomic(&frame_file_name(object_path, frame), &bytes)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.dir.join(name);
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|e| e.error)?;
        debug!("wrote {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::paths::frame_file_path;
    use serde_json::json;

    #[test]
    fn test_create_wipes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bake");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stale.json"), b"{}").unwrap();

        let writer = BakeWriter::create(&dir).unwrap();
        assert!(!dir.join("stale.json").exists());
        assert_eq!(writer.dir(), dir.as_path());
    }

    #[test]
    fn test_open_keeps_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("keep.json"), b"{}").unwrap();
        BakeWriter::open(tmp.path()).unwrap();
        assert!(tmp.path().join("keep.json").exists());
    }

    #[test]
    fn test_write_frame_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = BakeWriter::open(tmp.path()).unwrap();
        let payload = FramePayload::new(3).with_field("position", json!([[0, 0, 0]]));

        let written = writer.write_frame("/obj", &payload).unwrap();
        assert_eq!(written, frame_file_path(tmp.path(), "/obj", 3));

        let text = fs::read_to_string(written).unwrap();
        assert_eq!(text, r#"{"frame":3,"position":[[0,0,0]]}"#);
        // no temporary files left behind
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_frame_requires_frame_number() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = BakeWriter::open(tmp.path()).unwrap();
        let result = writer.write_frame("/obj", &FramePayload::default());
        assert!(matches!(result, Err(Error::MissingRequired(_))));
    }
}
