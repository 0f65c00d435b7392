//! Phase subprocess execution.
//!
//! Each phase is an external executable invoked as
//! `<script> <symbol> --work-dir <path> [flags]`. Exit code 0 is the only
//! success condition; non-zero exit, timeout, and a missing script are
//! distinct failure kinds. Every outcome, success or any failure, is
//! appended to the shared [`MetadataStore`], and no error crosses this
//! boundary as a panic or a propagated `Err`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use research_core::{PhaseDescriptor, Symbol};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::store::MetadataStore;

/// Runs research phases as isolated child processes.
#[derive(Clone, Debug)]
pub struct PhaseRunner {
    skills_dir: PathBuf,
}

impl PhaseRunner {
    /// Creates a runner resolving phase scripts against `skills_dir`.
    #[must_use]
    pub fn new(skills_dir: impl Into<PathBuf>) -> Self {
        Self {
            skills_dir: skills_dir.into(),
        }
    }

    /// Absolute or relative path of the script implementing `descriptor`.
    #[must_use]
    pub fn script_path(&self, descriptor: &PhaseDescriptor) -> PathBuf {
        self.skills_dir.join(&descriptor.script)
    }

    /// Executes one phase to completion and records its outcome.
    ///
    /// Returns true only when the child exited with code 0. The child's
    /// stdout is echoed to the parent's console; stderr is folded into the
    /// failure's error string on non-zero exit.
    pub async fn run_phase(
        &self,
        descriptor: &PhaseDescriptor,
        symbol: &Symbol,
        work_dir: &Path,
        store: &MetadataStore,
        extra_args: &[String],
    ) -> bool {
        let phase = descriptor.name.as_str();
        let script = self.script_path(descriptor);
        info!(phase, script = %script.display(), "Starting phase");

        let mut command = Command::new(&script);
        command
            .arg(symbol.as_str())
            .arg("--work-dir")
            .arg(work_dir)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out future drops the child; make the drop kill it
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let error = format!("Phase script not found: {}", script.display());
                warn!(phase, "{error}");
                store.record_failure(phase, error).await;
                return false;
            }
            Err(e) => {
                let error = format!("Phase '{phase}' could not be spawned: {e}");
                warn!(phase, "{error}");
                store.record_failure(phase, error).await;
                return false;
            }
        };

        let output = match timeout(descriptor.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let error = format!("Phase '{phase}' encountered unexpected error: {e}");
                warn!(phase, "{error}");
                store.record_failure(phase, error).await;
                return false;
            }
            Err(_) => {
                let minutes = descriptor.timeout.as_secs() / 60;
                let error = format!("Phase '{phase}' timed out after {minutes} minutes");
                warn!(phase, "{error}");
                store.record_failure(phase, error).await;
                return false;
            }
        };

        // Echo the child's progress output to the parent console
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            print!("{stdout}");
        }

        if output.status.success() {
            info!(phase, "Phase completed successfully");
            store.record_success(phase).await;
            return true;
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let mut error = format!("Phase '{phase}' failed with return code {code}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            error.push_str(": ");
            error.push_str(stderr.trim());
        }
        warn!(phase, "{error}");
        store.record_failure(phase, error).await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_core::{PhaseName, RunMetadata, Symbol};
    use std::time::Duration;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn descriptor(name: PhaseName, script: &str, timeout: Duration) -> PhaseDescriptor {
        PhaseDescriptor::new(name, script, &[], timeout)
    }

    struct Fixture {
        _skills: tempfile::TempDir,
        _work: tempfile::TempDir,
        runner: PhaseRunner,
        store: MetadataStore,
        work_dir: PathBuf,
        skills_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let skills = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let runner = PhaseRunner::new(skills.path());
        let store = MetadataStore::create(
            work.path(),
            RunMetadata::new(research_core::Symbol::new("TSLA")),
        )
        .unwrap();
        let work_dir = work.path().to_path_buf();
        let skills_dir = skills.path().to_path_buf();
        Fixture {
            _skills: skills,
            _work: work,
            runner,
            store,
            work_dir,
            skills_dir,
        }
    }

    #[tokio::test]
    async fn test_exit_zero_records_success() {
        let f = fixture();
        write_script(&f.skills_dir, "wiki.sh", "exit 0");
        let desc = descriptor(PhaseName::Wikipedia, "wiki.sh", Duration::from_secs(30));

        let ok = f
            .runner
            .run_phase(&desc, &"TSLA".into(), &f.work_dir, &f.store, &[])
            .await;

        assert!(ok);
        let meta = f.store.snapshot().await;
        assert_eq!(meta.phases_completed, vec!["wikipedia"]);
        assert!(meta.phases_failed.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_folds_stderr_into_error() {
        let f = fixture();
        write_script(&f.skills_dir, "tech.sh", "echo 'rate limited' >&2\nexit 1");
        let desc = descriptor(PhaseName::Technical, "tech.sh", Duration::from_secs(30));

        let ok = f
            .runner
            .run_phase(&desc, &"TSLA".into(), &f.work_dir, &f.store, &[])
            .await;

        assert!(!ok);
        let meta = f.store.snapshot().await;
        assert_eq!(meta.phases_failed, vec!["technical"]);
        assert!(meta.errors[0].contains("return code 1"));
        assert!(meta.errors[0].contains("rate limited"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_distinct_failure() {
        let f = fixture();
        write_script(&f.skills_dir, "slow.sh", "sleep 10");
        let desc = descriptor(PhaseName::Research, "slow.sh", Duration::from_millis(200));

        let ok = f
            .runner
            .run_phase(&desc, &"TSLA".into(), &f.work_dir, &f.store, &[])
            .await;

        assert!(!ok);
        let meta = f.store.snapshot().await;
        assert_eq!(meta.phases_failed, vec!["research"]);
        assert!(meta.errors[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_script_is_script_not_found() {
        let f = fixture();
        let desc = descriptor(PhaseName::Deep, "missing.sh", Duration::from_secs(30));

        let ok = f
            .runner
            .run_phase(&desc, &"TSLA".into(), &f.work_dir, &f.store, &[])
            .await;

        assert!(!ok);
        let meta = f.store.snapshot().await;
        assert_eq!(meta.phases_failed, vec!["deep"]);
        assert!(meta.errors[0].contains("Phase script not found"));
    }

    #[tokio::test]
    async fn test_child_receives_contract_arguments() {
        let f = fixture();
        // The script echoes its argv into a file inside the work dir
        write_script(&f.skills_dir, "args.sh", "echo \"$@\" > \"$3/args.txt\"");
        let desc = descriptor(PhaseName::Fundamental, "args.sh", Duration::from_secs(30));

        let ok = f
            .runner
            .run_phase(
                &desc,
                &"intc".into(),
                &f.work_dir,
                &f.store,
                &["--peers".to_string(), "AMD,NVDA".to_string()],
            )
            .await;

        assert!(ok);
        let args = std::fs::read_to_string(f.work_dir.join("args.txt")).unwrap();
        assert!(args.starts_with("INTC --work-dir"));
        assert!(args.trim_end().ends_with("--peers AMD,NVDA"));
    }

    #[tokio::test]
    async fn test_concurrent_phases_record_exactly_once() {
        let f = fixture();
        write_script(&f.skills_dir, "a.sh", "exit 0");
        write_script(&f.skills_dir, "b.sh", "exit 1");
        let desc_a = descriptor(PhaseName::Wikipedia, "a.sh", Duration::from_secs(30));
        let desc_b = descriptor(PhaseName::Sec, "b.sh", Duration::from_secs(30));

        let symbol: Symbol = "TSLA".into();
        let (ok_a, ok_b) = tokio::join!(
            f.runner.run_phase(&desc_a, &symbol, &f.work_dir, &f.store, &[]),
            f.runner.run_phase(&desc_b, &symbol, &f.work_dir, &f.store, &[]),
        );

        assert!(ok_a);
        assert!(!ok_b);
        let meta = f.store.snapshot().await;
        assert_eq!(meta.phases_completed, vec!["wikipedia"]);
        assert_eq!(meta.phases_failed, vec!["sec"]);
    }
}
