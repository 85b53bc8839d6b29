use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");

        // Point the binary at this test's database
        cmd.env("CADENCE_DATABASE_PATH", &self.db_path);
        cmd.current_dir(self.temp_dir.path());

        cmd
    }

    /// Get the database path for this test instance
    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Helper to run a command, assert success and hand back plain stdout
    pub fn run_stdout(&self, args: &[&str]) -> String {
        let assert = self.run_success(args);
        strip_ansi(&String::from_utf8_lossy(&assert.get_output().stdout))
    }
}

/// Drops ANSI style sequences so assertions see what a user would read.
pub fn strip_ansi(styled: &str) -> String {
    let mut plain = String::with_capacity(styled.len());
    let mut chars = styled.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for follower in chars.by_ref() {
                if follower == 'm' {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }
    plain
}

/// Pulls the first full UUID out of command output.
pub fn extract_id(output: &str) -> String {
    output
        .split_whitespace()
        .find(|token| {
            token.len() == 36
                && token
                    .char_indices()
                    .all(|(i, c)| match i {
                        8 | 13 | 18 | 23 => c == '-',
                        _ => c.is_ascii_hexdigit(),
                    })
        })
        .expect("No UUID in command output")
        .to_string()
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// A daily event without an end
    pub fn daily_event_args() -> Vec<&'static str> {
        vec!["add", "Morning standup", "--every", "daily", "--forever"]
    }

    /// A sparse weekly event with a fixed anchor and a count
    pub fn sparse_weekly_args() -> Vec<&'static str> {
        vec![
            "add",
            "Team sync",
            "--every",
            "weekly",
            "--interval",
            "2",
            "--on",
            "mon,wed",
            "--count",
            "4",
            "--start",
            "2025-01-06 09:30",
        ]
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains event table headers
    pub fn has_event_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Name"))
            .and(predicate::str::contains("Schedule"))
    }

    /// Predicate to check if output indicates successful event creation
    pub fn event_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("Created recurring event")
    }

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
