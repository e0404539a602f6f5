// Library scan hooks
//
// A host calls `on_library_management_file_test` while scanning a library and
// `on_worker_process` when a queued task reaches a worker. Both only set fields
// on the record they are handed; probing and progress parsing come in through
// `HookContext`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, LockMode};
use crate::error::{CcscanError, Result};
use crate::extractor::ExtractorCommandBuilder;
use crate::filters::{file_already_processed, file_ends_in_allowed_extensions};
use crate::lockfile;
use crate::probe::{CODEC_TYPE_DATA, Discovery, FfprobeProber, Prober};
use crate::progress::{CcextractorProgressParser, ProgressParser};

/// Capabilities the hooks depend on
#[derive(Clone)]
pub struct HookContext {
    pub config: Arc<Config>,
    pub prober: Arc<dyn Prober>,
    pub progress_parser: Arc<dyn ProgressParser>,
}

impl HookContext {
    /// Context using ffprobe and the ccextractor progress parser
    pub fn new(config: Config) -> Self {
        let prober = Arc::new(FfprobeProber::new(config.probe.clone()));
        Self {
            config: Arc::new(config),
            prober,
            progress_parser: Arc::new(CcextractorProgressParser::new()),
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }
}

/// Record handed to the file test hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTestData {
    /// Full path to the file being tested
    pub path: String,
    pub library_id: u64,
    /// Reasons found so far for not processing the file
    pub issues: Vec<String>,
    /// Whether the file should be added to the pending task queue
    pub add_file_to_pending_tasks: bool,
}

impl TaskTestData {
    pub fn new<S: Into<String>>(path: S, library_id: u64) -> Self {
        Self {
            path: path.into(),
            library_id,
            ..Self::default()
        }
    }
}

/// Record handed to the worker hook
#[derive(Clone, Default)]
pub struct TaskWorkerData {
    /// Log lines tailed by the host frontend
    pub worker_log: Vec<String>,
    pub library_id: u64,
    /// Command the host should execute, empty for none
    pub exec_command: Vec<String>,
    /// Parser the host feeds the command's stdout through
    pub command_progress_parser: Option<Arc<dyn ProgressParser>>,
    /// Source file the command reads
    pub file_in: String,
    /// Destination the command should write to
    pub file_out: String,
    /// Absolute path of the file as it sits in the library
    pub original_file_path: String,
    /// Whether the host should run this hook again with the same record
    pub repeat: bool,
}

impl fmt::Debug for TaskWorkerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWorkerData")
            .field("worker_log", &self.worker_log)
            .field("library_id", &self.library_id)
            .field("exec_command", &self.exec_command)
            .field("command_progress_parser", &self.command_progress_parser.is_some())
            .field("file_in", &self.file_in)
            .field("file_out", &self.file_out)
            .field("original_file_path", &self.original_file_path)
            .field("repeat", &self.repeat)
            .finish()
    }
}

impl TaskWorkerData {
    pub fn new<S1, S2, S3>(file_in: S1, file_out: S2, original_file_path: S3, library_id: u64) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            file_in: file_in.into(),
            file_out: file_out.into(),
            original_file_path: original_file_path.into(),
            library_id,
            ..Self::default()
        }
    }
}

/// Why the worker hook left the record without a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ProbeFailed,
    ExtensionNotAllowed,
    AlreadyProcessed,
    NothingDiscovered,
    /// Exclusive lock mode found the lock file already present
    LockHeld,
}

/// Result of the worker hook. Every variant carries the record back.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// A command was set on the record and the lock file written
    Dispatched {
        data: TaskWorkerData,
        discovery: Discovery,
        lock_file: PathBuf,
    },
    Skipped {
        data: TaskWorkerData,
        reason: SkipReason,
    },
    /// The probe report had no stream list at all. Kept apart from ordinary
    /// skips so callers can tell this malformed-probe case from the others.
    NoStreamList(TaskWorkerData),
}

impl WorkerOutcome {
    pub fn data(&self) -> &TaskWorkerData {
        match self {
            WorkerOutcome::Dispatched { data, .. } => data,
            WorkerOutcome::Skipped { data, .. } => data,
            WorkerOutcome::NoStreamList(data) => data,
        }
    }

    pub fn is_dispatched(&self) -> bool {
        matches!(self, WorkerOutcome::Dispatched { .. })
    }
}

/// File test hook.
///
/// Marks the file for the pending task queue when it probes as video, passes
/// the extension filter (if enabled) and has no sibling `.srt` yet. In every
/// other case the record comes back untouched.
pub async fn on_library_management_file_test(mut data: TaskTestData, ctx: &HookContext) -> TaskTestData {
    let settings = ctx.config.settings_for(data.library_id);
    let path = Path::new(&data.path);

    if let Err(e) = ctx.prober.probe(path).await {
        debug!("Probe failed for '{}', skipping file test: {}", data.path, e);
        return data;
    }

    if settings.limit_to_extensions
        && !file_ends_in_allowed_extensions(path, &settings.allowed_extensions)
    {
        return data;
    }

    if !file_already_processed(path) {
        data.add_file_to_pending_tasks = true;
        debug!("File has not been processed previously '{}'. It should be added to task list.", data.path);
    }

    data
}

/// Worker hook.
///
/// Probes `file_in` and, when it carries a data or subtitle stream, sets the
/// ccextractor command and progress parser on the record and writes the lock
/// file. Extension filtering and the already-processed check look at
/// `original_file_path` rather than the staged input.
///
/// Only a lock file error is returned as `Err`; everything else is an outcome.
/// The lock file is written before any field is set, so an `Err` never
/// follows a half-filled record.
pub async fn on_worker_process(mut data: TaskWorkerData, ctx: &HookContext) -> Result<WorkerOutcome> {
    // No command unless one is required
    data.exec_command = Vec::new();
    data.repeat = false;

    let settings = ctx.config.settings_for(data.library_id);

    let probed = ctx.prober.probe(Path::new(&data.file_in)).await;
    let probe = match probed {
        Ok(probe) => probe,
        Err(e) => {
            debug!("Probe failed for '{}', skipping worker: {}", data.file_in, e);
            return Ok(WorkerOutcome::Skipped { data, reason: SkipReason::ProbeFailed });
        }
    };

    if settings.limit_to_extensions
        && !file_ends_in_allowed_extensions(&data.original_file_path, &settings.allowed_extensions)
    {
        return Ok(WorkerOutcome::Skipped { data, reason: SkipReason::ExtensionNotAllowed });
    }

    if file_already_processed(&data.original_file_path) {
        return Ok(WorkerOutcome::Skipped { data, reason: SkipReason::AlreadyProcessed });
    }

    let Some(streams) = probe.stream_list() else {
        return Ok(WorkerOutcome::NoStreamList(data));
    };
    debug!("Probe stream report : {:?}", streams);

    let Some(discovery) = probe.discovery() else {
        info!("No subtitle found");
        return Ok(WorkerOutcome::Skipped { data, reason: SkipReason::NothingDiscovered });
    };
    match discovery.codec_type {
        CODEC_TYPE_DATA => info!("Data found : {}", discovery.codec_name),
        _ => info!("Subtitle found : {}", discovery.codec_name),
    }

    let profile_directory = ctx.config.profile_directory(data.library_id);

    // The lock file is in place before the record carries a command
    let lock_file = match ctx.config.profile.lock_mode {
        LockMode::Exclusive => match lockfile::claim_exclusive(&profile_directory, &data.original_file_path) {
            Ok(path) => path,
            Err(CcscanError::LockHeld(path)) => {
                info!("Lock file {} already exists, not dispatching again", path);
                return Ok(WorkerOutcome::Skipped { data, reason: SkipReason::LockHeld });
            }
            Err(e) => return Err(e),
        },
        LockMode::Marker => lockfile::write_marker(&profile_directory, &data.original_file_path)?,
    };

    let command = ExtractorCommandBuilder::new(ctx.config.extractor.clone()).extract(&data.file_in);
    data.command_progress_parser = Some(Arc::clone(&ctx.progress_parser));

    info!("Execute CCextractor for {}.", data.file_in);
    data.exec_command = command.to_exec_command();

    Ok(WorkerOutcome::Dispatched { data, discovery, lock_file })
}
