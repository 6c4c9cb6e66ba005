use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Nothing listens on the discard port, so requests fail fast.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");
        let data_dir = temp_dir.path().join("data");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_ghstore"));

        Self {
            _temp_dir: temp_dir,
            config_dir,
            data_dir,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("GHSTORE_CONFIG_DIR", &self.config_dir);
        cmd.env("GHSTORE_DATA_DIR", &self.data_dir);
        cmd.env("GHSTORE_DIRECTORY_URL", format!("{}/repos.json", UNREACHABLE));
        cmd.env("GHSTORE_API_BASE", UNREACHABLE);
        cmd.env("HOME", self._temp_dir.path());
        cmd.env_remove("GITHUB_TOKEN");
        cmd.env_remove("GH_TOKEN");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Write the local directory copy used when the remote one is unreachable.
    pub fn write_directory(&self, json: &str) {
        fs::create_dir_all(&self.config_dir).expect("Failed to create config dir");
        fs::write(self.config_dir.join("repos.json"), json).expect("Failed to write directory");
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("installed.json")
    }

    pub fn write_registry(&self, json: &str) {
        fs::create_dir_all(&self.data_dir).expect("Failed to create data dir");
        fs::write(self.registry_path(), json).expect("Failed to write registry");
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.cmd()
            .args(args)
            .output()
            .expect("Failed to run ghstore")
            .into()
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.status.success(),
            "Command unexpectedly succeeded\nstdout: {}",
            self.stdout
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
