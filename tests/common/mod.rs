// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed fake system (kernel mount table,
// fstab, block statistics, media directory) plus scripted stand-ins
// for the executor, prompt and busy probe, so each integration test runs
// the real orchestration code without touching block devices.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::os::unix::fs::MetadataExt as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ntfs_mount::config::{Config, Settings};
use ntfs_mount::context::Context;
use ntfs_mount::error::MountError;
use ntfs_mount::exec::{ExecResult, Executor};
use ntfs_mount::logging::{Log, Logger};
use ntfs_mount::ntfs::usage::{Holder, ResourceUsageProbe};
use ntfs_mount::platform::InvokingUser;
use ntfs_mount::prompt::{Confirmation, Prompt};

/// Successful command output.
pub fn ok(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
        code: Some(0),
    }
}

/// Failed command output.
pub fn fail(code: i32, stderr: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        success: false,
        code: Some(code),
    }
}

/// Executor answering command lines by prefix.
///
/// The most recently added matching script wins; a script's last result
/// repeats once the others are used up. Unscripted commands exit 127.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<Vec<(String, VecDeque<ExecResult>)>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, prefix: &str, results: Vec<ExecResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((prefix.to_string(), results.into()));
        self
    }

    /// Command lines run so far.
    pub fn history(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Number of command lines starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.history()
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }

    fn answer(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.log.lock().unwrap().push(line.clone());
        let mut scripts = self.scripts.lock().unwrap();
        for (prefix, results) in scripts.iter_mut().rev() {
            if line.starts_with(prefix.as_str()) {
                return if results.len() > 1 {
                    results.pop_front().unwrap()
                } else {
                    results.front().cloned().unwrap()
                };
            }
        }
        fail(127, &format!("unscripted: {line}"))
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let result = self.answer(program, args);
        anyhow::ensure!(result.success, "{program} failed: {}", result.message());
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(self.answer(program, args))
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
        self.answer(program, args);
        Ok(())
    }

    fn which(&self, program: &str) -> bool {
        program != "systemctl"
    }
}

/// Prompt giving the same answer to every question.
#[derive(Debug)]
pub struct FixedPrompt(pub Confirmation);

impl Prompt for FixedPrompt {
    fn confirm(&self, _question: &str) -> Confirmation {
        self.0
    }

    fn read_line(&self, _prompt: &str) -> Option<String> {
        None
    }
}

/// Busy probe reporting the same holders for every mount point.
#[derive(Debug, Default)]
pub struct StaticProbe(pub Vec<Holder>);

impl ResourceUsageProbe for StaticProbe {
    fn holders(&self, _mount_point: &Path) -> Result<Vec<Holder>, MountError> {
        Ok(self.0.clone())
    }
}

/// A fake system rooted in a [`tempfile::TempDir`].
pub struct FakeSystem {
    pub root: tempfile::TempDir,
}

impl FakeSystem {
    /// Empty mount table and fstab.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::write(root.path().join("mounts"), "").expect("write mounts");
        std::fs::write(root.path().join("fstab"), "# static file system information\n")
            .expect("write fstab");
        std::fs::create_dir_all(root.path().join("media")).expect("create media");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Base directory for mount points.
    pub fn media(&self) -> PathBuf {
        self.path().join("media")
    }

    pub fn fstab(&self) -> PathBuf {
        self.path().join("fstab")
    }

    /// Replace the kernel mount table.
    pub fn set_mounts(&self, content: &str) {
        std::fs::write(self.path().join("mounts"), content).expect("write mounts");
    }

    /// Settings pointing every system path into the fake root.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.paths.fstab = self.fstab();
        settings.paths.mounts = self.path().join("mounts");
        settings.paths.proc = self.path().join("proc");
        settings.paths.sys_block = self.path().join("sys");
        settings
    }

    /// A config for `alice`, owned by the current process so chown succeeds
    /// unprivileged, with the media directory as base.
    pub fn config(&self) -> Config {
        let meta = std::fs::metadata(self.path()).expect("stat temp dir");
        let user = InvokingUser {
            name: "alice".into(),
            uid: meta.uid(),
            gid: meta.gid(),
            home: self.path().join("home"),
        };
        let mut config = Config::new(user, self.settings());
        config.base_dir = self.media();
        config.debug = true;
        config
    }

    /// A context wired to the given collaborators; the returned logger is
    /// the one the context logs through.
    pub fn context(
        &self,
        config: Config,
        executor: Arc<ScriptedExecutor>,
        holders: Vec<Holder>,
        answer: Confirmation,
    ) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::new(None));
        let ctx = Context::new(
            config,
            Arc::clone(&log) as Arc<dyn Log>,
            executor,
            Arc::new(StaticProbe(holders)),
            Arc::new(FixedPrompt(answer)),
        );
        (ctx, log)
    }
}

/// `lsblk -J` output for the given `(device, label, uuid)` triples.
pub fn lsblk(devices: &[(&str, Option<&str>, &str)]) -> String {
    let entries: Vec<String> = devices
        .iter()
        .map(|(dev, label, uuid)| {
            let label = label.map_or_else(|| "null".to_string(), |l| format!("\"{l}\""));
            format!(
                r#"{{"name":"{dev}","fstype":"ntfs","label":{label},"uuid":"{uuid}","mountpoint":null}}"#
            )
        })
        .collect();
    format!(r#"{{"blockdevices":[{}]}}"#, entries.join(","))
}
