use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{CcscanError, Result};
use crate::extractor::{ExtractorCommand, ExtractorCommandBuilder};
use crate::hooks::{
    on_library_management_file_test, on_worker_process, HookContext, SkipReason, TaskTestData,
    TaskWorkerData, WorkerOutcome,
};

/// Counters collected over a directory scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub queued: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sequential stand-in for the host: runs the file test, then the worker,
/// then optionally the returned command. One file at a time.
pub struct Runner {
    ctx: HookContext,
    library_id: u64,
    execute: bool,
}

impl Runner {
    pub fn new(ctx: HookContext, library_id: u64, execute: bool) -> Self {
        Self { ctx, library_id, execute }
    }

    /// Check the external tools the runner is about to use
    pub async fn check_dependencies(&self) -> Result<()> {
        if self.execute {
            ExtractorCommandBuilder::new(self.ctx.config.extractor.clone())
                .check_availability()
                .await?;
        }
        Ok(())
    }

    /// Run the file test hook for one path
    pub async fn test_file<P: AsRef<Path>>(&self, path: P) -> TaskTestData {
        let data = TaskTestData::new(path.as_ref().to_string_lossy(), self.library_id);
        on_library_management_file_test(data, &self.ctx).await
    }

    /// Run the worker hook for one file, executing the command when asked to.
    ///
    /// `original` defaults to `input` when the file was not staged elsewhere.
    pub async fn process_file<P: AsRef<Path>>(
        &self,
        input: P,
        output: Option<P>,
        original: Option<P>,
    ) -> Result<WorkerOutcome> {
        let input = input.as_ref();
        if !input.exists() {
            return Err(CcscanError::FileNotFound(input.display().to_string()));
        }

        let output = output.map(|p| p.as_ref().to_path_buf()).unwrap_or_else(|| input.to_path_buf());
        let original = original.map(|p| p.as_ref().to_path_buf()).unwrap_or_else(|| input.to_path_buf());

        let data = TaskWorkerData::new(
            input.to_string_lossy(),
            output.to_string_lossy(),
            original.to_string_lossy(),
            self.library_id,
        );
        let outcome = on_worker_process(data, &self.ctx).await?;

        if self.execute && outcome.is_dispatched() {
            self.execute_command(outcome.data()).await?;
        }

        Ok(outcome)
    }

    /// Walk a library directory and push every file through both hooks
    pub async fn scan_directory<P: AsRef<Path>>(&self, dir: P) -> Result<ScanSummary> {
        let dir = dir.as_ref();
        info!("Scanning library directory: {}", dir.display());

        if !dir.is_dir() {
            return Err(CcscanError::Config("Input path is not a directory".to_string()));
        }

        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut summary = ScanSummary::default();
        for path in files {
            summary.scanned += 1;

            let tested = self.test_file(&path).await;
            if !tested.add_file_to_pending_tasks {
                continue;
            }
            summary.queued += 1;

            match self.process_file(&path, None, None).await {
                Ok(WorkerOutcome::Dispatched { discovery, .. }) => {
                    info!("Dispatched {} ({} {})", path.display(), discovery.codec_type, discovery.codec_name);
                    summary.dispatched += 1;
                }
                Ok(WorkerOutcome::Skipped { reason, .. }) => {
                    if reason == SkipReason::LockHeld {
                        info!("Skipped {}: already claimed", path.display());
                    }
                    summary.skipped += 1;
                }
                Ok(WorkerOutcome::NoStreamList(_)) => {
                    warn!("Probe of {} returned no stream list", path.display());
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Scan finished: {} scanned, {} queued, {} dispatched, {} skipped, {} failed",
            summary.scanned, summary.queued, summary.dispatched, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Execute the command a worker hook set, the way a host would
    async fn execute_command(&self, data: &TaskWorkerData) -> Result<()> {
        let Some((binary, args)) = data.exec_command.split_first() else {
            return Ok(());
        };
        let parser = data
            .command_progress_parser
            .clone()
            .unwrap_or_else(|| self.ctx.progress_parser.clone());

        let command = ExtractorCommand::new(binary.as_str(), "Caption extraction").args(args.iter().cloned());

        let pb = ProgressBar::new(100);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .map_err(|e| CcscanError::Extractor(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-"));
        pb.set_message(data.file_in.clone());

        let result = command
            .execute_with_progress(parser.as_ref(), |event| {
                if let Some(percent) = event.percent {
                    pb.set_position(percent as u64);
                }
            })
            .await;

        match &result {
            Ok(()) => pb.finish_with_message(format!("Extracted captions from {}", data.file_in)),
            Err(_) => pb.abandon_with_message(format!("Extraction failed for {}", data.file_in)),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::probe::{ProbeResult, Prober, StreamInfo};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Arc;

    /// Reports caption streams for `.ts` files and plain video for the rest
    struct ExtensionProber;

    #[async_trait]
    impl Prober for ExtensionProber {
        async fn probe(&self, path: &Path) -> Result<ProbeResult> {
            match path.extension().and_then(|e| e.to_str()) {
                Some("ts") => Ok(ProbeResult::from_streams(vec![
                    StreamInfo::new(0, "video", "mpeg2video"),
                    StreamInfo::new(1, "subtitle", "eia_608"),
                ])),
                Some("mkv") => Ok(ProbeResult::from_streams(vec![StreamInfo::new(0, "video", "h264")])),
                _ => Err(CcscanError::Probe("not a video".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_scan_directory_summary() {
        let library = tempfile::tempdir().unwrap();
        let profile = tempfile::tempdir().unwrap();

        fs::create_dir_all(library.path().join("show")).unwrap();
        for name in ["show/ep1.ts", "show/ep2.ts", "show/ep2.srt", "show/ep3.mkv", "cover.jpg"] {
            fs::write(library.path().join(name), b"").unwrap();
        }

        let mut config = Config::default();
        config.profile.directory = profile.path().to_path_buf();
        let ctx = HookContext::new(config).with_prober(Arc::new(ExtensionProber));
        let runner = Runner::new(ctx, 1, false);

        let summary = runner.scan_directory(library.path()).await.unwrap();
        assert_eq!(
            summary,
            ScanSummary {
                scanned: 5,
                // ep1.ts and ep3.mkv; ep2.ts already has a subtitle
                queued: 2,
                dispatched: 1,
                skipped: 1,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_process_missing_file() {
        let runner = Runner::new(HookContext::new(Config::default()), 1, false);
        let err = runner.process_file(Path::new("/nonexistent/ep1.ts"), None, None).await.unwrap_err();
        assert!(matches!(err, CcscanError::FileNotFound(_)));
    }
}
