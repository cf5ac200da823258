//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running gitvan against throwaway repositories.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;

// Keep daemon start/stop fast; a slow test is a bug.
const GITVAN_TIMEOUT_START_MS: &str = "5000";
const GITVAN_TIMEOUT_EXIT_MS: &str = "500";
const GITVAN_CLI_POLL_MS: &str = "5";
const GITVAN_POLL_MS: &str = "50";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Path to a workspace binary, checking the llvm-cov target first and
/// falling back to the directory of the test executable.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // target/debug/deps/specs-<hash> -> target/debug/
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn gitvan_binary() -> PathBuf {
    binary_path("gitvan")
}

pub fn gitvand_binary() -> PathBuf {
    binary_path("gitvand")
}

/// Fluent builder around one gitvan invocation.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                (
                    "GITVAN_DAEMON_BINARY".into(),
                    gitvand_binary().to_string_lossy().into(),
                ),
                ("GITVAN_TIMEOUT_START_MS".into(), GITVAN_TIMEOUT_START_MS.into()),
                ("GITVAN_TIMEOUT_EXIT_MS".into(), GITVAN_TIMEOUT_EXIT_MS.into()),
                ("GITVAN_CLI_POLL_MS".into(), GITVAN_CLI_POLL_MS.into()),
                ("GITVAN_POLL_MS".into(), GITVAN_POLL_MS.into()),
                ("NO_COLOR".into(), "1".into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    pub fn command(self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(gitvan_binary());
        cmd.args(&self.args);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        // A parent shell's settings must not leak into the repository under test
        cmd.env_remove("GITVAN_ROOT_DIR");
        cmd.env_remove("GITVAN_LOG");
        for key in GIT_IDENTITY_VARS {
            cmd.env_remove(key);
        }
        cmd.envs(GIT_ISOLATION);
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn output(self) -> Output {
        self.command().output().expect("command should run")
    }

    /// Run and expect exit code 0.
    pub fn passes(self) -> RunAssert {
        let output = self.output();
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect a non-zero exit code.
    pub fn fails(self) -> RunAssert {
        let output = self.output();
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect exactly `code`.
    pub fn exits(self, code: i32) -> RunAssert {
        let output = self.output();
        assert_eq!(
            output.status.code(),
            Some(code),
            "unexpected exit code\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Parse stdout as JSON (for `-o json`).
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({})\nstdout: {}", e, self.stdout())
        })
    }

    /// Exact stdout comparison with a diff on failure.
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

/// Poll `condition` until it holds or `timeout_ms` passes.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// Git config comes only from the repository under test.
const GIT_ISOLATION: [(&str, &str); 2] = [
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
];

/// Identity overrides a developer shell may export.
const GIT_IDENTITY_VARS: [&str; 5] = [
    "GIT_AUTHOR_NAME",
    "GIT_AUTHOR_EMAIL",
    "GIT_COMMITTER_NAME",
    "GIT_COMMITTER_EMAIL",
    "EMAIL",
];

/// Temporary git repository with helper methods.
pub struct Repo {
    dir: tempfile::TempDir,
}

impl Repo {
    /// An initialized repository with one commit on `main`.
    pub fn new() -> Self {
        let repo = Self::bare_dir();
        repo.git(&["init", "-q", "-b", "main"]);
        repo.git(&["config", "user.name", "Spec"]);
        repo.git(&["config", "user.email", "spec@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo.git(&["config", "tag.gpgsign", "false"]);
        repo.file("README.md", "# test\n");
        repo.file(".gitignore", ".gitvan/\nout.txt\n");
        repo.commit("initial");
        repo
    }

    /// A directory that is not a git repository.
    pub fn bare_dir() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let mut cmd = std::process::Command::new("git");
        for key in GIT_IDENTITY_VARS {
            cmd.env_remove(key);
        }
        let output = cmd
            .envs(GIT_ISOLATION)
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("git should run");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write a file (parent directories created automatically).
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Stage everything and commit; returns the new HEAD sha.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn read(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.path().join(path)).ok()
    }

    /// gitvan rooted at this repository.
    pub fn gitvan(&self) -> CliBuilder {
        CliBuilder::new()
            .pwd(self.path())
            .env("GITVAN_ROOT_DIR", self.path())
    }

    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.path().join(".gitvan/logs/daemon.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Drop for Repo {
    fn drop(&mut self) {
        // No-op unless a spec left the daemon running
        if self.path().join(".gitvan/state/daemon.pid").exists() {
            let _ = self.gitvan().args(&["daemon", "stop"]).command().output();
        }
    }
}

/// On-demand job that writes a file and reports it as an artifact.
pub const BUILD_JOB: &str = r#"
[meta]
desc = "Build the site"
tags = ["ci"]

[[run]]
shell = "echo built > out.txt"
"#;

/// Job that fires when files under `src/` change.
pub const LINT_JOB: &str = r#"
on = { pathChanged = ["src/**"] }

[meta]
desc = "Lint sources"

[[run]]
shell = "true"
"#;

/// Job due at 03:15 UTC every day.
pub const NIGHTLY_JOB: &str = r#"
cron = "15 3 * * *"

[[run]]
shell = "true"
"#;
