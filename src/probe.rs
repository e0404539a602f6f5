// Media probing
//
// Hooks only see the `Prober` trait; `FfprobeProber` is the default
// implementation that shells out to ffprobe and decodes its JSON report.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::{CcscanError, Result};

/// Codec type ffprobe reports for data streams (e.g. DVB teletext, SCTE-35, captions in data tracks)
pub const CODEC_TYPE_DATA: &str = "data";
/// Codec type ffprobe reports for subtitle streams
pub const CODEC_TYPE_SUBTITLE: &str = "subtitle";

/// One stream of a probed file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_name: Option<String>,
}

/// Result of probing a file. `streams` is `None` when the report carried no
/// stream list at all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub streams: Option<Vec<StreamInfo>>,
}

/// What made a file worth running the extractor on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub codec_type: &'static str,
    pub codec_name: String,
}

impl StreamInfo {
    pub fn new<S1: Into<String>, S2: Into<String>>(index: usize, codec_type: S1, codec_name: S2) -> Self {
        Self {
            index,
            codec_type: Some(codec_type.into()),
            codec_name: Some(codec_name.into()),
        }
    }
}

impl ProbeResult {
    pub fn from_streams(streams: Vec<StreamInfo>) -> Self {
        Self {
            streams: Some(streams),
        }
    }

    /// Decode an ffprobe `-print_format json` report
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Streams of the file, `None` when the list is absent or empty
    pub fn stream_list(&self) -> Option<&[StreamInfo]> {
        self.streams.as_deref().filter(|streams| !streams.is_empty())
    }

    /// First stream with the given codec type
    pub fn first_stream_of_type(&self, codec_type: &str) -> Option<&StreamInfo> {
        self.streams
            .as_deref()?
            .iter()
            .find(|stream| stream.codec_type.as_deref() == Some(codec_type))
    }

    /// Look for a data stream first, then a subtitle stream.
    ///
    /// Only the first stream of the matching type is considered. A matching
    /// stream without a codec name does not count as a discovery, and a data
    /// stream shadows any subtitle stream.
    pub fn discovery(&self) -> Option<Discovery> {
        let (codec_type, stream) = if let Some(stream) = self.first_stream_of_type(CODEC_TYPE_DATA) {
            (CODEC_TYPE_DATA, stream)
        } else if let Some(stream) = self.first_stream_of_type(CODEC_TYPE_SUBTITLE) {
            (CODEC_TYPE_SUBTITLE, stream)
        } else {
            return None;
        };

        stream
            .codec_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| Discovery {
                codec_type,
                codec_name: name.to_string(),
            })
    }
}

/// Capability to probe media files
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a file. Any failure (unsupported mimetype, tool error,
    /// unreadable report) is an error.
    async fn probe(&self, path: &Path) -> Result<ProbeResult>;
}

/// Guess the mimetype of a media file from its extension
pub fn guess_mimetype(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    let mimetype = match extension.as_str() {
        "ts" | "m2ts" | "mts" => "video/mp2t",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" | "qt" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" | "mpe" | "vob" => "video/mpeg",
        "3gp" => "video/3gpp",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/x-wav",
        "ogg" | "oga" => "audio/ogg",
        "srt" => "application/x-subrip",
        "vtt" => "text/vtt",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mimetype)
}

/// Prober backed by the ffprobe binary
pub struct FfprobeProber {
    config: ProbeConfig,
}

impl FfprobeProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Whether the file's guessed mimetype belongs to an allowed family.
    /// An empty allow list accepts every file.
    fn mimetype_allowed(&self, path: &Path) -> bool {
        if self.config.allowed_mimetypes.is_empty() {
            return true;
        }
        match guess_mimetype(path) {
            Some(mimetype) => self
                .config
                .allowed_mimetypes
                .iter()
                .any(|allowed| mimetype.contains(allowed.as_str())),
            None => false,
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        if !path.exists() {
            return Err(CcscanError::FileNotFound(path.display().to_string()));
        }

        if !self.mimetype_allowed(path) {
            debug!("File '{}' does not match the allowed mimetypes {:?}", path.display(), self.config.allowed_mimetypes);
            return Err(CcscanError::Probe(format!(
                "Unsupported mimetype for {}",
                path.display()
            )));
        }

        let output = Command::new(&self.config.binary_path)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
            .map_err(|e| CcscanError::Probe(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CcscanError::Probe(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = ProbeResult::from_json(&stdout)?;
        debug!("Probed {}: {} streams", path.display(), result.streams.as_ref().map_or(0, |s| s.len()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const FFPROBE_REPORT: &str = r#"{
        "streams": [
            { "index": 0, "codec_name": "mpeg2video", "codec_type": "video" },
            { "index": 1, "codec_name": "ac3", "codec_type": "audio" },
            { "index": 2, "codec_name": "dvb_teletext", "codec_type": "subtitle" },
            { "index": 3, "codec_type": "data", "codec_tag_string": "[6][0][0][0]" }
        ],
        "format": { "format_name": "mpegts", "duration": "1800.250000" }
    }"#;

    #[test]
    fn test_decode_ffprobe_report() {
        let result = ProbeResult::from_json(FFPROBE_REPORT).unwrap();
        assert_eq!(result.stream_list().unwrap().len(), 4);
        assert_eq!(
            result.first_stream_of_type(CODEC_TYPE_SUBTITLE).unwrap().codec_name.as_deref(),
            Some("dvb_teletext")
        );
    }

    #[test]
    fn test_data_stream_without_codec_name_shadows_subtitle() {
        let result = ProbeResult::from_json(FFPROBE_REPORT).unwrap();
        assert_eq!(result.discovery(), None);
    }

    #[test]
    fn test_data_stream_preferred_over_subtitle() {
        let result = ProbeResult::from_streams(vec![
            StreamInfo::new(0, "video", "h264"),
            StreamInfo::new(1, "subtitle", "eia_608"),
            StreamInfo::new(2, "data", "bin_data"),
        ]);
        assert_eq!(
            result.discovery(),
            Some(Discovery {
                codec_type: CODEC_TYPE_DATA,
                codec_name: "bin_data".to_string()
            })
        );
    }

    #[test]
    fn test_subtitle_discovery() {
        let result = ProbeResult::from_streams(vec![
            StreamInfo::new(0, "video", "h264"),
            StreamInfo::new(1, "subtitle", "eia_608"),
        ]);
        let discovery = result.discovery().unwrap();
        assert_eq!(discovery.codec_type, CODEC_TYPE_SUBTITLE);
        assert_eq!(discovery.codec_name, "eia_608");
    }

    #[test]
    fn test_no_discovery_for_plain_video() {
        let result = ProbeResult::from_streams(vec![
            StreamInfo::new(0, "video", "h264"),
            StreamInfo::new(1, "audio", "aac"),
        ]);
        assert_eq!(result.discovery(), None);
    }

    #[test]
    fn test_missing_and_empty_stream_lists() {
        let missing = ProbeResult::from_json(r#"{ "format": {} }"#).unwrap();
        assert!(missing.stream_list().is_none());

        let empty = ProbeResult::from_json(r#"{ "streams": [] }"#).unwrap();
        assert!(empty.stream_list().is_none());
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype(&PathBuf::from("/a/ep1.TS")), Some("video/mp2t"));
        assert_eq!(guess_mimetype(&PathBuf::from("/a/song.mp3")), Some("audio/mpeg"));
        assert_eq!(guess_mimetype(&PathBuf::from("/a/noext")), None);
    }

    #[tokio::test]
    async fn test_ffprobe_prober_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"").unwrap();

        let prober = FfprobeProber::new(crate::config::Config::default().probe);
        let err = prober.probe(&path).await.unwrap_err();
        assert!(matches!(err, CcscanError::Probe(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ffprobe_prober_reads_report() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"streams\": [{\"index\": 0, \"codec_type\": \"subtitle\", \"codec_name\": \"eia_608\"}]}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let video = dir.path().join("ep1.ts");
        std::fs::write(&video, b"").unwrap();

        let mut config = crate::config::Config::default().probe;
        config.binary_path = script.to_string_lossy().to_string();
        let result = FfprobeProber::new(config).probe(&video).await.unwrap();

        assert_eq!(result.discovery().unwrap().codec_name, "eia_608");
    }

    #[tokio::test]
    async fn test_ffprobe_prober_missing_file() {
        let prober = FfprobeProber::new(crate::config::Config::default().probe);
        let err = prober.probe(Path::new("/nonexistent/ep1.ts")).await.unwrap_err();
        assert!(matches!(err, CcscanError::FileNotFound(_)));
    }
}
