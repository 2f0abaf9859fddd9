//! The parallel fitness evaluator (§4.4): for one configuration, materializes a scratch
//! workspace, drives the backend's formatter subprocess over every example file, scores and
//! aggregates, and reports through the bounded [`cache::CachePointer`]. Grounded on
//! `original_source/measure.py`'s `measure_file`/`get_num_deleted_lines`/`measure` for the exact
//! subprocess and scoring contract, generalized from "always clang-format" to "whichever
//! [`Backend`] the caller supplies", and on the teacher crate's `Fitness` trait for the
//! "evaluate one genome, optionally through a cache" shape.
pub mod cache;

use crate::backend::Backend;
use crate::config::Config;
use crate::errors::UnformatError;
use crate::population::{FitnessValue, FitnessVector};
use cache::{CachePointer, FileScoreKey};
use std::io::Write as _;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Default bound on the fitness memoization cache (§4.4: "a bounded capacity (LRU, e.g., ~4096
/// entries)").
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// The seam [`crate::controller::EvolveController`] evaluates candidates through. [`FitnessEvaluator`]
/// is the only production implementation; test property 8 ("construct a mock evaluator returning
/// a scripted sequence of best/worst pairs") and the end-to-end scenarios that need a stand-in
/// formatter (§8 "Test tooling") substitute a second implementation instead of spawning real
/// subprocesses.
pub trait Evaluator: std::fmt::Debug + Send + Sync {
    fn evaluate(&self, config: &Config) -> Result<Option<FitnessVector>, UnformatError>;
}

#[derive(Debug)]
pub struct FitnessEvaluator {
    backend: Arc<dyn Backend>,
    command: String,
    example_paths: Vec<std::path::PathBuf>,
    cache: CachePointer,
}

impl FitnessEvaluator {
    pub fn new(backend: Arc<dyn Backend>, command: String, example_paths: Vec<std::path::PathBuf>) -> Self {
        Self {
            backend,
            command,
            example_paths,
            cache: CachePointer::new(DEFAULT_CACHE_SIZE),
        }
    }

    fn score_one_file(
        &self,
        workspace_path: &Path,
        source_path: &Path,
    ) -> Result<Option<(FitnessValue, FitnessValue)>, UnformatError> {
        let source_filename = source_path.to_string_lossy().into_owned();
        let original = std::fs::read(source_path).map_err(UnformatError::ScratchWorkspace)?;

        let args = self.backend.format_args(&self.command, &source_filename);
        let output = spawn_with_stdin(&self.command, &args, Some(workspace_path), &original)
            .map_err(|source| UnformatError::FormatterSpawn {
                command: self.command.clone(),
                source,
            })?;

        if let Some(signal) = output.status.signal() {
            eprint!("!");
            log::warn!(
                "hard failure formatting '{source_filename}': terminated by signal {signal}"
            );
            return Ok(None);
        }
        if !output.status.success() {
            eprint!("?");
            log::warn!(
                "soft failure formatting '{source_filename}': exit status {:?}, stderr: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            );
            return Ok(None);
        }

        let formatted = output.stdout;
        let edit_distance = distance::levenshtein(
            &String::from_utf8_lossy(&original),
            &String::from_utf8_lossy(&formatted),
        ) as FitnessValue;
        let deleted_lines = count_deleted_lines(source_path, &formatted)?;

        eprint!(".");
        log::trace!("scored '{source_filename}': edit_distance={edit_distance}, deleted_lines={deleted_lines}");

        Ok(Some((edit_distance, deleted_lines)))
    }
}

impl Evaluator for FitnessEvaluator {
    /// Evaluate one configuration against the whole example corpus (§4.4 steps 1-5). `Ok(None)`
    /// signals a failed evaluation (soft or hard failure on any single file); per the spec, a
    /// single file's failure invalidates the whole candidate, no partial credit.
    fn evaluate(&self, config: &Config) -> Result<Option<FitnessVector>, UnformatError> {
        let workspace = tempfile::tempdir().map_err(UnformatError::ScratchWorkspace)?;
        let config_bytes = self.backend.encode(config);
        let config_path = workspace.path().join(self.backend.default_config_filename());
        std::fs::write(&config_path, &config_bytes).map_err(UnformatError::ScratchWorkspace)?;

        let mut edit_distance_sum: FitnessValue = 0;
        let mut deleted_lines_sum: FitnessValue = 0;

        for source_path in &self.example_paths {
            let source_filename = source_path.to_string_lossy().into_owned();
            let key = FileScoreKey {
                command: self.command.clone(),
                source_filename: source_filename.clone(),
                config_bytes: config_bytes.clone(),
            };

            let score = match self.cache.read(&key) {
                Some(cached) => cached,
                None => match self.score_one_file(workspace.path(), source_path)? {
                    Some(score) => {
                        self.cache.write(&key, score);
                        score
                    }
                    None => return Ok(None),
                },
            };

            edit_distance_sum += score.0;
            deleted_lines_sum += score.1;
        }

        Ok(Some(vec![edit_distance_sum, deleted_lines_sum]))
    }
}

/// Spawn `command args`, optionally in `cwd`, feed `stdin_bytes` to its standard input, and
/// capture its combined output. Mirrors Python's `Popen(..., stdout=PIPE, stdin=PIPE,
/// stderr=STDOUT).communicate(...)` from `measure.py`'s `measure_file`: stdin is written on its
/// own thread, concurrently with the parent reading stdout/stderr via `wait_with_output`, so a
/// formatter that writes more than a pipe buffer's worth of output before finishing reading stdin
/// can't deadlock against this process. stderr is kept separate rather than merged, since the
/// Rust side only needs it for the diagnostic log line on failure.
fn spawn_with_stdin(
    command: &str,
    args: &[String],
    cwd: Option<&Path>,
    stdin_bytes: &[u8],
) -> std::io::Result<std::process::Output> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let mut child = cmd.spawn()?;
    let mut stdin = child.stdin.take().expect("stdin was piped");

    std::thread::scope(|scope| {
        scope.spawn(|| {
            // A formatter that exits early (e.g. on a malformed config) closes its stdin and
            // this write then fails with a broken pipe; that's reflected in the exit status the
            // caller already inspects, so it's not this thread's job to report it.
            let _ = stdin.write_all(stdin_bytes);
            drop(stdin);
        });
        child.wait_with_output()
    })
}

/// §6 "Diff subprocess": `diff --changed-group-format='%<' --unchanged-group-format='' original -`
/// with the formatted output on stdin; the number of newlines in its stdout is the deleted-line
/// count.
fn count_deleted_lines(
    original_path: &Path,
    formatted: &[u8],
) -> Result<FitnessValue, UnformatError> {
    let output = spawn_with_stdin(
        "diff",
        &[
            "--changed-group-format=%<".to_string(),
            "--unchanged-group-format=".to_string(),
            original_path.to_string_lossy().into_owned(),
            "-".to_string(),
        ],
        None,
        formatted,
    )
    .map_err(|source| UnformatError::FormatterSpawn {
        command: "diff".to_string(),
        source,
    })?;
    Ok(output.stdout.iter().filter(|&&b| b == b'\n').count() as FitnessValue)
}
