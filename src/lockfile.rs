use md5::{Digest, Md5};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CcscanError, Result};

/// Hex MD5 digest of the path string, used as the lock file stem
pub fn source_file_hash(original_file_path: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(original_file_path.as_bytes());
    hex::encode(hasher.finalize())
}

/// `<profile_directory>/<md5(original_file_path)>.lock`
pub fn lock_file_path<P: AsRef<Path>>(profile_directory: P, original_file_path: &str) -> PathBuf {
    profile_directory
        .as_ref()
        .join(format!("{}.lock", source_file_hash(original_file_path)))
}

/// Write an empty marker, truncating any existing one
pub fn write_marker<P: AsRef<Path>>(profile_directory: P, original_file_path: &str) -> Result<PathBuf> {
    let profile_directory = profile_directory.as_ref();
    fs::create_dir_all(profile_directory)?;

    let path = lock_file_path(profile_directory, original_file_path);
    fs::File::create(&path)?;
    debug!("Wrote lock file {}", path.display());
    Ok(path)
}

/// Create the lock file only if it does not exist yet.
///
/// Returns `CcscanError::LockHeld` when another dispatch already claimed it.
pub fn claim_exclusive<P: AsRef<Path>>(profile_directory: P, original_file_path: &str) -> Result<PathBuf> {
    let profile_directory = profile_directory.as_ref();
    fs::create_dir_all(profile_directory)?;

    let path = lock_file_path(profile_directory, original_file_path);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            debug!("Claimed lock file {}", path.display());
            Ok(path)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(CcscanError::LockHeld(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_hash() {
        // md5 of the empty string and of "abc"
        assert_eq!(source_file_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(source_file_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_marker_is_empty_and_rewritable() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("profile");

        let path = write_marker(&profile, "/media/show/ep1.ts").unwrap();
        assert_eq!(path, lock_file_path(&profile, "/media/show/ep1.ts"));
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        // Writing the marker again is not an error
        write_marker(&profile, "/media/show/ep1.ts").unwrap();
    }

    #[test]
    fn test_exclusive_claim_only_once() {
        let dir = tempfile::tempdir().unwrap();

        claim_exclusive(dir.path(), "/media/show/ep1.ts").unwrap();
        let err = claim_exclusive(dir.path(), "/media/show/ep1.ts").unwrap_err();
        assert!(matches!(err, CcscanError::LockHeld(_)));

        claim_exclusive(dir.path(), "/media/show/ep2.ts").unwrap();
    }
}
