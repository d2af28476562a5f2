//! Integration tests for default log-to-file behavior.
//!
//! Runs the binary without --quiet and checks that logs land in the default
//! file under the platform data directory, away from stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Matches default_log_file in src/logging.rs on Linux.
fn expected_log_path(data_home: &Path) -> PathBuf {
    data_home.join("folio").join("folio.log")
}

fn run_folio(temp_dir: &TempDir, extra_args: &[&str]) -> Output {
    let data_home = temp_dir.path().join("data");
    let config_home = temp_dir.path().join("config");
    let home = temp_dir.path().join("home");
    let workspace = temp_dir.path().join("ws");
    for dir in [&data_home, &config_home, &home, &workspace] {
        fs::create_dir_all(dir).unwrap();
    }

    let bin = env!("CARGO_BIN_EXE_folio");
    Command::new(bin)
        .env("XDG_DATA_HOME", data_home.as_os_str())
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env("HOME", home.as_os_str())
        .env_remove("FOLIO_LOG")
        .env_remove("FOLIO_LOG_OUTPUT")
        .env_remove("FOLIO_LOG_FORMAT")
        .arg("--workspace")
        .arg(&workspace)
        .args(extra_args)
        .arg("tiers")
        .output()
        .unwrap()
}

#[test]
#[cfg(target_os = "linux")]
fn test_default_logging_writes_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_folio(&temp_dir, &[]);

    assert!(
        output.status.success(),
        "folio tiers should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gemini-3-flash-preview"));
    assert!(!stdout.contains("Folio CLI starting"), "logs must stay off stdout");

    let log_path = expected_log_path(&temp_dir.path().join("data"));
    assert!(log_path.exists(), "log file should exist at {}", log_path.display());
    let content = fs::read_to_string(&log_path).unwrap();
    assert!(
        content.contains("Folio CLI starting"),
        "log file should contain a startup message; got: {}",
        content.lines().next().unwrap_or("")
    );
}

#[test]
#[cfg(target_os = "linux")]
fn test_verbose_logging_mirrors_to_stderr_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_folio(&temp_dir, &["--verbose"]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.trim().is_empty(), "verbose mode should emit logs to stderr");
    assert!(expected_log_path(&temp_dir.path().join("data")).exists());
}

#[test]
fn test_quiet_writes_no_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_folio(&temp_dir, &["--quiet"]);

    assert!(output.status.success());
    assert!(!expected_log_path(&temp_dir.path().join("data")).exists());
}
