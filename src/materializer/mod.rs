//! Turns a [`RunConfig`] into files on disk.
//!
//! A run checks free space, prepares the output directory and then writes one
//! file at a time, in generation order. Each file gets a unique random name
//! and, when a size is requested, unique random content; otherwise its content
//! is its own name. A failure stops the run but keeps every file already
//! written.
//!
//! ```text
//! NotStarted -> SpacePreflight -> DirectoryReady -> Writing(0..n) -> Completed
//!                     |                                  |
//!                     +------------> Failed <------------+
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::MaterializeError;
use crate::generator::{CharacterClasses, UniqueStringGenerator};

mod io;
mod pacing;
pub mod space;

pub use io::{UTF8_BOM, write_file};
pub use pacing::CancelToken;
pub use space::{DiskSpaceProbe, SpaceCheck, SysinfoProbe};

use pacing::Pacer;

/// Length of the random part of every file name.
pub const DEFAULT_NAME_LENGTH: usize = 10;

/// Free space that a run must leave untouched.
pub const DEFAULT_SAFETY_MARGIN: u64 = 500_000_000;

/// Fully resolved options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub file_count: u64,
    /// Used verbatim, including any separator.
    pub prefix: String,
    /// Includes the leading `.`, or is empty.
    pub extension: String,
    pub output_directory: PathBuf,
    /// Content length in characters. `None` makes each file contain its name.
    pub size_in_bytes: Option<usize>,
    pub creation_delay: Duration,
    pub character_classes: CharacterClasses,
    pub name_length: usize,
    /// Prepend a UTF-8 byte order mark. Off by default so a sized file is
    /// exactly `size_in_bytes` long.
    pub write_bom: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            file_count: 1,
            prefix: String::new(),
            extension: String::new(),
            output_directory: PathBuf::from("output"),
            size_in_bytes: None,
            creation_delay: Duration::ZERO,
            character_classes: CharacterClasses::ALL,
            name_length: DEFAULT_NAME_LENGTH,
            write_bom: false,
        }
    }
}

impl RunConfig {
    pub fn new(file_count: u64) -> Self {
        RunConfig {
            file_count,
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = output_directory.into();
        self
    }

    pub fn with_size(mut self, size_in_bytes: Option<usize>) -> Self {
        self.size_in_bytes = size_in_bytes;
        self
    }

    pub fn with_delay(mut self, creation_delay: Duration) -> Self {
        self.creation_delay = creation_delay;
        self
    }

    pub fn with_character_classes(mut self, classes: CharacterClasses) -> Self {
        self.character_classes = classes;
        self
    }

    pub fn with_name_length(mut self, name_length: usize) -> Self {
        self.name_length = name_length;
        self
    }

    pub fn with_bom(mut self, write_bom: bool) -> Self {
        self.write_bom = write_bom;
        self
    }

    /// Rejects a prefix or extension that would place files outside the
    /// output directory.
    pub fn validate(&self) -> Result<(), MaterializeError> {
        for (part, value) in [("prefix", &self.prefix), ("extension", &self.extension)] {
            if value.contains(PATH_SEPARATORS) {
                return Err(MaterializeError::InvalidFileSpec {
                    reason: format!("the {part} cannot contain path separators"),
                });
            }
        }
        Ok(())
    }

    /// Rough number of bytes the run will need, for the preflight only.
    /// Saturates instead of overflowing.
    pub fn required_disk_space(&self) -> u64 {
        let per_file = match self.size_in_bytes {
            Some(size) => size as u64,
            None => self.prefix.len().saturating_add(self.name_length) as u64,
        };
        self.file_count.saturating_mul(per_file)
    }
}

const PATH_SEPARATORS: [char; 3] = ['/', '\\', '\0'];

/// A validated name and content pair for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    name: String,
    content: String,
}

impl FileSpec {
    pub fn new(name: String, content: String) -> Result<Self, MaterializeError> {
        let invalid = |reason: &str| MaterializeError::InvalidFileSpec {
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("a file name must be specified"));
        }
        if name.contains(PATH_SEPARATORS) {
            return Err(invalid("file names cannot contain path separators"));
        }
        if content.trim().is_empty() {
            return Err(invalid("file content must be specified"));
        }

        Ok(FileSpec { name, content })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub created: u64,
    pub total: u64,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.created as f64 * 100.0 / self.total as f64
    }
}

/// Receives a [`Progress`] update after every file written.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    InsufficientSpace,
    InvalidFileSpec,
    Write,
    Cancelled,
}

impl MaterializeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            MaterializeError::Generator(_) => FailureKind::Configuration,
            MaterializeError::InsufficientSpace { .. } => FailureKind::InsufficientSpace,
            MaterializeError::InvalidFileSpec { .. } => FailureKind::InvalidFileSpec,
            MaterializeError::WriteError { .. } => FailureKind::Write,
            MaterializeError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    SpacePreflight,
    DirectoryReady,
    Writing { index: u64 },
    Completed,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub files_created: u64,
    pub bytes_written: u64,
    pub output_directory: PathBuf,
    pub space_check: SpaceCheck,
    pub pauses: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

pub struct FileMaterializer<P: DiskSpaceProbe = SysinfoProbe> {
    probe: P,
    seed: Option<u64>,
    check_space: bool,
    safety_margin: u64,
    cancel: CancelToken,
    state: RunState,
}

impl FileMaterializer<SysinfoProbe> {
    pub fn new() -> Self {
        FileMaterializer {
            probe: SysinfoProbe,
            seed: None,
            check_space: true,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            cancel: CancelToken::new(),
            state: RunState::NotStarted,
        }
    }

    /// Names and contents are drawn from generators seeded with `seed` and
    /// `seed + 1`, so a run can be reproduced exactly.
    pub fn seeded(seed: u64) -> Self {
        Self::new().with_seed(Some(seed))
    }
}

impl Default for FileMaterializer<SysinfoProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DiskSpaceProbe> FileMaterializer<P> {
    pub fn with_probe<Q: DiskSpaceProbe>(self, probe: Q) -> FileMaterializer<Q> {
        FileMaterializer {
            probe,
            seed: self.seed,
            check_space: self.check_space,
            safety_margin: self.safety_margin,
            cancel: self.cancel,
            state: self.state,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_space_check(mut self, check_space: bool) -> Self {
        self.check_space = check_space;
        self
    }

    pub fn with_safety_margin(mut self, safety_margin: u64) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    /// Handle for stopping the run from another thread or a progress callback.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run(&mut self, config: &RunConfig) -> Result<RunResult, MaterializeError> {
        self.run_with_progress(config, |_: Progress| {})
    }

    pub fn run_with_progress(
        &mut self,
        config: &RunConfig,
        mut progress: impl ProgressSink,
    ) -> Result<RunResult, MaterializeError> {
        self.state = RunState::NotStarted;
        let result = self.execute(config, &mut progress);

        match &result {
            Ok(summary) => {
                self.transition(RunState::Completed);
                info!(
                    "RUN | created {} files ({} bytes) in {:?}",
                    summary.files_created, summary.bytes_written, summary.elapsed
                );
            }
            Err(err) => {
                self.transition(RunState::Failed(err.kind()));
                warn!(error = %err, "RUN | stopped");
            }
        }
        result
    }

    fn execute(
        &mut self,
        config: &RunConfig,
        progress: &mut impl ProgressSink,
    ) -> Result<RunResult, MaterializeError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(
            "RUN | {} files into {:?} (size {:?}, delay {:?})",
            config.file_count,
            config.output_directory,
            config.size_in_bytes,
            config.creation_delay
        );

        // config and alphabet problems surface before anything touches the disk
        config.validate()?;
        let (mut names, mut contents) = self.generators(config.character_classes)?;

        let mut summary = RunResult {
            files_created: 0,
            bytes_written: 0,
            output_directory: config.output_directory.clone(),
            space_check: SpaceCheck::Skipped,
            pauses: 0,
            started_at,
            elapsed: Duration::ZERO,
        };
        if config.file_count == 0 {
            return Ok(summary);
        }

        self.transition(RunState::SpacePreflight);
        if self.check_space {
            summary.space_check = space::preflight(
                &self.probe,
                &config.output_directory,
                config.required_disk_space(),
                self.safety_margin,
            )?;
        }

        fs::create_dir_all(&config.output_directory).map_err(|source| {
            MaterializeError::WriteError {
                path: config.output_directory.clone(),
                source,
            }
        })?;
        self.transition(RunState::DirectoryReady);

        let mut pacer = Pacer::new(config.creation_delay, self.cancel.clone());
        for index in 0..config.file_count {
            if self.cancel.is_cancelled() {
                return Err(MaterializeError::Cancelled { created: index });
            }
            self.transition(RunState::Writing { index });

            let random_name = names.generate_unique(config.name_length)?;
            let file_name = format!("{}{}", config.prefix, random_name);
            let content = match config.size_in_bytes {
                Some(size) => contents.generate_unique(size)?,
                None => file_name.clone(),
            };
            let spec = FileSpec::new(file_name, content)?;

            let path = config
                .output_directory
                .join(format!("{}{}", spec.name(), config.extension));
            let written = write_file(&path, spec.content(), config.write_bom)
                .map_err(|source| MaterializeError::WriteError {
                    path: path.clone(),
                    source,
                })?;
            debug!("RUN | wrote {:?} ({} bytes)", path, written);

            summary.files_created = index + 1;
            summary.bytes_written += written;
            progress.report(Progress {
                created: summary.files_created,
                total: config.file_count,
            });

            if summary.files_created < config.file_count && pacer.pause() {
                return Err(MaterializeError::Cancelled {
                    created: summary.files_created,
                });
            }
        }

        summary.pauses = pacer.pauses();
        summary.elapsed = timer.elapsed();
        Ok(summary)
    }

    fn generators(
        &self,
        classes: CharacterClasses,
    ) -> Result<(UniqueStringGenerator, UniqueStringGenerator), MaterializeError> {
        Ok(match self.seed {
            Some(seed) => (
                UniqueStringGenerator::seeded(classes, seed)?,
                UniqueStringGenerator::seeded(classes, seed.wrapping_add(1))?,
            ),
            None => (
                UniqueStringGenerator::new(classes)?,
                UniqueStringGenerator::new(classes)?,
            ),
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!("RUN | {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
