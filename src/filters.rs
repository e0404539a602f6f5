use std::path::Path;
use tracing::{debug, info};

/// Extension of `path` without the dot, lowercased. Empty when there is none.
fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Check whether the file's extension is one of the comma separated `allowed_extensions`.
///
/// Matching is case-insensitive and tolerates whitespace and leading dots in the
/// list. An empty list means the plugin has not been configured yet, which blocks
/// every file.
pub fn file_ends_in_allowed_extensions<P: AsRef<Path>>(path: P, allowed_extensions: &str) -> bool {
    let path = path.as_ref();

    let allowed: Vec<String> = allowed_extensions
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();

    if allowed.is_empty() {
        debug!("Plugin has not yet been configured with a list of file extensions to allow. Blocking everything.");
        return false;
    }

    let extension = lowercase_extension(path);
    if !extension.is_empty() && allowed.iter().any(|ext| *ext == extension) {
        return true;
    }

    debug!(
        "File '{}' does not end in the specified file extensions '{}'.",
        path.display(),
        allowed_extensions
    );
    false
}

/// A file counts as processed when `<stem>.srt` sits next to it.
pub fn file_already_processed<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();

    let Some(stem) = path.file_stem() else {
        return false;
    };
    let mut srt_name = stem.to_os_string();
    srt_name.push(".srt");

    let srt_path = match path.parent() {
        Some(dir) => dir.join(srt_name),
        None => srt_name.into(),
    };

    if srt_path.exists() {
        info!("File was previously processed with ccextractor: {}", path.display());
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extension_membership() {
        assert!(file_ends_in_allowed_extensions("/media/show/ep1.ts", "ts"));
        assert!(file_ends_in_allowed_extensions("/media/show/ep1.TS", "mkv, ts"));
        assert!(file_ends_in_allowed_extensions("/media/show/ep1.mkv", "TS,.MKV"));
        assert!(!file_ends_in_allowed_extensions("/media/show/ep1.mp4", "ts,mkv"));
    }

    #[test]
    fn test_extension_is_not_substring_matched() {
        assert!(!file_ends_in_allowed_extensions("/media/show/ep1.s", "ts"));
        assert!(!file_ends_in_allowed_extensions("/media/show/ep1", "ts"));
    }

    #[test]
    fn test_empty_extension_list_blocks_everything() {
        assert!(!file_ends_in_allowed_extensions("/media/show/ep1.ts", ""));
        assert!(!file_ends_in_allowed_extensions("/media/show/ep1.ts", " , "));
    }

    #[test]
    fn test_already_processed_by_sibling_srt() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("ep1.ts");
        fs::write(&video, b"").unwrap();

        assert!(!file_already_processed(&video));

        fs::write(dir.path().join("ep1.srt"), b"").unwrap();
        assert!(file_already_processed(&video));
    }

    #[test]
    fn test_differently_named_subtitle_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("ep1.ts");
        fs::write(dir.path().join("ep1.en.srt"), b"").unwrap();

        assert!(!file_already_processed(&video));
    }
}
