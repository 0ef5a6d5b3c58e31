//! Modification-time polling and transactional program swaps.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::compile::CompileError;
use crate::stage::{PipelineProgram, StageChain, StageKind};

/// Source of modification timestamps.
pub trait SourceClock {
    /// `None` when the file is missing or its metadata cannot be read.
    fn modified(&self, path: &Path) -> Option<SystemTime>;
}

/// Reads timestamps from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsClock;

impl SourceClock for FsClock {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        match fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(stamp) => Some(stamp),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "shader timestamp unavailable");
                None
            }
        }
    }
}

/// Turns stage source text into a program the backend can run.
pub trait ProgramCompiler {
    type Program;

    fn compile(&mut self, stage: StageKind, source: &str) -> Result<Self::Program, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadResult {
    Unchanged,
    Reloaded,
    FailedKeptOld,
}

/// Reads and compiles one stage source; used at startup and for candidates.
pub fn build_program<C>(compiler: &mut C, stage: StageKind, path: &Path) -> Result<C::Program, CompileError>
where
    C: ProgramCompiler + ?Sized,
{
    let source = fs::read_to_string(path).map_err(|source| CompileError::Read {
        stage,
        path: path.to_path_buf(),
        source,
    })?;
    compiler.compile(stage, &source)
}

/// Loads a stage for the first time. Failure here is fatal to the caller.
pub fn load_stage<C>(
    compiler: &mut C,
    clock: &dyn SourceClock,
    stage: StageKind,
    path: PathBuf,
) -> Result<PipelineProgram<C::Program>, CompileError>
where
    C: ProgramCompiler + ?Sized,
{
    let stamp = clock.modified(&path);
    let program = build_program(compiler, stage, &path)?;
    tracing::info!(stage = %stage, path = %path.display(), "stage loaded");
    Ok(PipelineProgram::new(stage, program, path, stamp))
}

/// Loads all three stages from `shader_dir`.
pub fn load_chain<C>(
    compiler: &mut C,
    clock: &dyn SourceClock,
    shader_dir: &Path,
) -> Result<StageChain<C::Program>, CompileError>
where
    C: ProgramCompiler + ?Sized,
{
    let mut load = |stage: StageKind| load_stage(compiler, clock, stage, shader_dir.join(stage.file_name()));
    Ok(StageChain {
        simulate: load(StageKind::Simulate)?,
        normalize: load(StageKind::Normalize)?,
        present: load(StageKind::Present)?,
    })
}

/// Recompiles `program` if its source changed since it was last seen.
///
/// The active program is replaced only when the candidate builds. Either
/// way the new timestamp is recorded, so a broken source is not retried
/// until it is edited again.
pub fn check_and_reload<C>(
    program: &mut PipelineProgram<C::Program>,
    compiler: &mut C,
    clock: &dyn SourceClock,
) -> ReloadResult
where
    C: ProgramCompiler + ?Sized,
{
    let Some(stamp) = clock.modified(program.source()) else {
        return ReloadResult::Unchanged;
    };
    if program.last_seen() == Some(stamp) {
        return ReloadResult::Unchanged;
    }

    let stage = program.stage();
    program.mark_seen(Some(stamp));
    match build_program(compiler, stage, program.source()) {
        Ok(candidate) => {
            drop(program.promote(candidate));
            tracing::info!(
                stage = %stage,
                generation = program.generation(),
                "shader reloaded"
            );
            ReloadResult::Reloaded
        }
        Err(err) => {
            tracing::warn!(stage = %stage, error = %err, "shader reload failed; keeping previous program");
            program.reject(&err);
            ReloadResult::FailedKeptOld
        }
    }
}

/// Polls every stage in pipeline order.
pub fn check_chain<C>(
    chain: &mut StageChain<C::Program>,
    compiler: &mut C,
    clock: &dyn SourceClock,
) -> Vec<(StageKind, ReloadResult)>
where
    C: ProgramCompiler + ?Sized,
{
    StageKind::ALL
        .into_iter()
        .map(|stage| (stage, check_and_reload(chain.get_mut(stage), compiler, clock)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeClock {
        stamps: RefCell<HashMap<PathBuf, SystemTime>>,
    }

    impl FakeClock {
        fn touch(&self, path: &Path, secs: u64) {
            self.stamps
                .borrow_mut()
                .insert(path.to_path_buf(), SystemTime::UNIX_EPOCH + Duration::from_secs(secs));
        }
    }

    impl SourceClock for FakeClock {
        fn modified(&self, path: &Path) -> Option<SystemTime> {
            self.stamps.borrow().get(path).copied()
        }
    }

    #[derive(Default)]
    struct CountingCompiler {
        attempts: usize,
    }

    impl ProgramCompiler for CountingCompiler {
        type Program = String;

        fn compile(&mut self, stage: StageKind, source: &str) -> Result<String, CompileError> {
            self.attempts += 1;
            if source.contains("broken") {
                return Err(CompileError::Parse {
                    stage,
                    message: "broken source".into(),
                });
            }
            Ok(source.trim().to_string())
        }
    }

    fn fixture(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("normalize.wgsl");
        fs::write(&path, contents).expect("write source");
        (dir, path)
    }

    #[test]
    fn unchanged_timestamp_skips_compilation() {
        let (_dir, path) = fixture("v1");
        let clock = FakeClock::default();
        clock.touch(&path, 10);
        let mut compiler = CountingCompiler::default();
        let mut program = load_stage(&mut compiler, &clock, StageKind::Normalize, path).expect("load");
        assert_eq!(compiler.attempts, 1);

        let result = check_and_reload(&mut program, &mut compiler, &clock);
        assert_eq!(result, ReloadResult::Unchanged);
        assert_eq!(compiler.attempts, 1);
    }

    #[test]
    fn changed_source_is_swapped_in() {
        let (_dir, path) = fixture("v1");
        let clock = FakeClock::default();
        clock.touch(&path, 10);
        let mut compiler = CountingCompiler::default();
        let mut program =
            load_stage(&mut compiler, &clock, StageKind::Normalize, path.clone()).expect("load");

        fs::write(&path, "v2").expect("rewrite");
        clock.touch(&path, 11);
        let result = check_and_reload(&mut program, &mut compiler, &clock);
        assert_eq!(result, ReloadResult::Reloaded);
        assert_eq!(program.program(), "v2");
        assert_eq!(program.generation(), 2);
    }

    #[test]
    fn failed_candidate_keeps_program_and_records_timestamp() {
        let (_dir, path) = fixture("v1");
        let clock = FakeClock::default();
        clock.touch(&path, 10);
        let mut compiler = CountingCompiler::default();
        let mut program =
            load_stage(&mut compiler, &clock, StageKind::Normalize, path.clone()).expect("load");

        fs::write(&path, "broken").expect("rewrite");
        clock.touch(&path, 12);
        let result = check_and_reload(&mut program, &mut compiler, &clock);
        assert_eq!(result, ReloadResult::FailedKeptOld);
        assert_eq!(program.program(), "v1");
        assert_eq!(
            program.last_seen(),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(12))
        );
        assert!(program.last_error().is_some());

        // not retried until the file changes again
        let attempts = compiler.attempts;
        assert_eq!(
            check_and_reload(&mut program, &mut compiler, &clock),
            ReloadResult::Unchanged
        );
        assert_eq!(compiler.attempts, attempts);
    }

    #[test]
    fn missing_source_counts_as_unchanged() {
        let (_dir, path) = fixture("v1");
        let clock = FakeClock::default();
        clock.touch(&path, 10);
        let mut compiler = CountingCompiler::default();
        let mut program = load_stage(&mut compiler, &clock, StageKind::Normalize, path).expect("load");

        clock.stamps.borrow_mut().clear();
        assert_eq!(
            check_and_reload(&mut program, &mut compiler, &clock),
            ReloadResult::Unchanged
        );
        assert_eq!(program.program(), "v1");
    }

    #[test]
    fn unreadable_candidate_fails_without_swapping() {
        let (dir, path) = fixture("v1");
        let clock = FakeClock::default();
        clock.touch(&path, 10);
        let mut compiler = CountingCompiler::default();
        let mut program =
            load_stage(&mut compiler, &clock, StageKind::Normalize, path.clone()).expect("load");

        fs::remove_file(&path).expect("remove source");
        clock.touch(&path, 13);
        let result = check_and_reload(&mut program, &mut compiler, &clock);
        assert_eq!(result, ReloadResult::FailedKeptOld);
        assert_eq!(program.program(), "v1");
        assert!(program.last_error().is_some_and(|msg| msg.contains("failed to read")));
        drop(dir);
    }

    #[test]
    fn initial_load_failure_is_an_error() {
        let (_dir, path) = fixture("broken");
        let mut compiler = CountingCompiler::default();
        let err = load_stage(&mut compiler, &FsClock, StageKind::Normalize, path).expect_err("broken");
        assert_eq!(err.stage(), StageKind::Normalize);
    }

    #[test]
    fn fs_clock_reports_missing_files_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(FsClock.modified(&dir.path().join("absent.wgsl")), None);
        let (_dir, path) = fixture("v1");
        assert!(FsClock.modified(&path).is_some());
    }
}
