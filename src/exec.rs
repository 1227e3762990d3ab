//! External command execution behind an injectable [`Executor`].
use anyhow::{Context, Result, bail};
use std::process::{Command, Output, Stdio};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Standard error if present, otherwise standard output, trimmed.
    #[must_use]
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution so orchestration logic can be tested
/// without touching real block devices.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Start a command in the background without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started.
    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.run_unchecked(program, args)?;
        if !result.success {
            bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.message()
            );
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn: {program}"))?;
        // Reap in the background so the hook never lingers as a zombie.
        std::thread::spawn(move || child.wait());
        Ok(())
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Scripted executor for unit tests.
///
/// Responses are matched by command-line prefix (`"mount -t ntfs3"`); the
/// most recently added matching rule wins, so later rules override earlier
/// defaults.  Each rule holds a queue of results: results are
/// consumed in order and the last one repeats.  Unmatched commands fail with
/// exit code 127.  Every invocation is recorded for ordering assertions.
#[cfg(test)]
pub mod test_helpers {
    use super::{ExecResult, Executor};
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    /// Build a successful result with the given stdout.
    #[must_use]
    pub fn ok(stdout: &str) -> ExecResult {
        ExecResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Build a failed result with the given exit code and stderr.
    #[must_use]
    pub fn fail(code: i32, stderr: &str) -> ExecResult {
        ExecResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            code: Some(code),
        }
    }

    #[derive(Debug)]
    struct Rule {
        prefix: String,
        results: VecDeque<ExecResult>,
    }

    /// Prefix-matching mock [`Executor`].
    #[derive(Debug, Default)]
    pub struct MockExecutor {
        rules: Mutex<Vec<Rule>>,
        calls: Mutex<Vec<String>>,
        spawned: Mutex<Vec<String>>,
        missing: HashSet<String>,
    }

    impl MockExecutor {
        /// Create a mock with no rules; every program is "installed".
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer commands starting with `prefix` with `results` in order.
        #[must_use]
        pub fn on(self, prefix: &str, results: Vec<ExecResult>) -> Self {
            if let Ok(mut rules) = self.rules.lock() {
                rules.push(Rule {
                    prefix: prefix.to_string(),
                    results: results.into(),
                });
            }
            self
        }

        /// Make [`Executor::which`] report `program` as missing.
        #[must_use]
        pub fn without(mut self, program: &str) -> Self {
            self.missing.insert(program.to_string());
            self
        }

        /// Every command line executed so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map_or_else(|_| vec![], |g| g.clone())
        }

        /// Number of executed command lines starting with `prefix`.
        #[must_use]
        pub fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        /// Command lines passed to [`Executor::spawn_detached`].
        #[must_use]
        pub fn spawned(&self) -> Vec<String> {
            self.spawned.lock().map_or_else(|_| vec![], |g| g.clone())
        }

        fn respond(&self, line: &str) -> ExecResult {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(line.to_string());
            }
            let Ok(mut rules) = self.rules.lock() else {
                return fail(127, "mutex poisoned");
            };
            for rule in rules.iter_mut().rev() {
                if line.starts_with(&rule.prefix) {
                    if rule.results.len() > 1
                        && let Some(next) = rule.results.pop_front()
                    {
                        return next;
                    }
                    if let Some(last) = rule.results.front() {
                        return last.clone();
                    }
                }
            }
            fail(127, &format!("unexpected call: {line}"))
        }
    }

    fn line(program: &str, args: &[&str]) -> String {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    impl Executor for MockExecutor {
        fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            let result = self.respond(&line(program, args));
            if result.success {
                Ok(result)
            } else {
                anyhow::bail!("{program} failed: {}", result.message())
            }
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            Ok(self.respond(&line(program, args)))
        }

        fn spawn_detached(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
            if let Ok(mut spawned) = self.spawned.lock() {
                spawned.push(line(program, args));
            }
            Ok(())
        }

        fn which(&self, program: &str) -> bool {
            !self.missing.contains(program)
        }
    }
}
