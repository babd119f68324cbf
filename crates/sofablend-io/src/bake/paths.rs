//! File naming inside a bake directory.
//!
//! Frame files are named by the MD5 of the object's simulation path and the
//! frame number, so re-baking the same scene produces the same file names
//! and no index is needed to find them.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

/// Name of the hierarchy manifest inside a bake directory.
pub const SCENE_FILE: &str = "scene.json";

/// Lowercase hex MD5 digest of a string.
pub fn hash_digest(value: &str) -> String {
    format!("{:x}", Md5::digest(value.as_bytes()))
}

/// `"{md5(path)}_{frame}.json"`
pub fn frame_file_name(object_path: &str, frame: u64) -> String {
    format!("{}_{}.json", hash_digest(object_path), frame)
}

/// Full path of a frame file inside `dir`.
pub fn frame_file_path(dir: &Path, object_path: &str, frame: u64) -> PathBuf {
    dir.join(frame_file_name(object_path, frame))
}

/// Full path of the manifest inside `dir`.
pub fn scene_file_path(dir: &Path) -> PathBuf {
    dir.join(SCENE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_digest() {
        assert_eq!(hash_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hash_digest("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_frame_file_name_is_deterministic() {
        let a = frame_file_name("/Liver/dofs", 12);
        let b = frame_file_name("/Liver/dofs", 12);
        assert_eq!(a, b);
        assert!(a.ends_with("_12.json"));
        assert_eq!(a.len(), 32 + "_12.json".len());
        assert_ne!(a, frame_file_name("/Liver/visual", 12));
    }

    #[test]
    fn test_paths_join_dir() {
        let dir = Path::new("bake");
        assert_eq!(scene_file_path(dir), Path::new("bake/scene.json"));
        assert_eq!(
            frame_file_path(dir, "abc", 0),
            Path::new("bake/900150983cd24fb0d6963f7d28e17f72_0.json")
        );
    }
}
