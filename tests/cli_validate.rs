use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn native_prep(temp: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("native-prep");
    cmd.current_dir(temp.path())
        .env("NATIVE_PREP_CONFIG", temp.path().join("native-prep.toml"));
    cmd
}

#[test]
fn aborts_without_project_marker() {
    let temp = TempDir::new().unwrap();
    native_prep(&temp)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(contains("Aborted"))
        .stdout(contains("pom.xml"));
}

#[test]
fn json_report_for_aborted_run() {
    let temp = TempDir::new().unwrap();
    let output = native_prep(&temp)
        .args(["validate", "--json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["state"]["state"], "aborted");
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert!(steps.iter().all(|step| step["outcome"] == "pending"));
}

#[cfg(unix)]
mod scripted {
    use super::*;

    /// Fake Maven wrapper: logs each goal, fails on `FAIL_GOAL`, and on `package`
    /// optionally produces a runner that sleeps past the smoke timeout.
    fn project(fail_goal: &str, produce_binary: bool) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pom.xml"), "<project/>").unwrap();
        let package = if produce_binary {
            "mkdir -p target\n  printf '#!/bin/sh\\necho $$ > runner.pid\\nsleep 30\\n' > target/app-runner\n  chmod +x target/app-runner\n"
        } else {
            ":\n"
        };
        fs::write(
            temp.path().join("mvnw"),
            format!(
                "echo \"$1\" >> calls.log\n\
                 if [ \"$1\" = \"{fail_goal}\" ]; then\n  echo \"[ERROR] $1 broke\" >&2\n  exit 1\nfi\n\
                 if [ \"$1\" = \"package\" ]; then\n  {package}fi\n\
                 echo \"[INFO] BUILD SUCCESS\"\n"
            ),
        )
        .unwrap();
        fs::write(
            temp.path().join("native-prep.toml"),
            "[validate]\nbuild_tool = \"sh ./mvnw\"\nartifact = \"target/app-runner\"\nsmoke_timeout_secs = 1\n",
        )
        .unwrap();
        temp
    }

    fn calls(temp: &TempDir) -> Vec<String> {
        fs::read_to_string(temp.path().join("calls.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn stops_at_failing_step() {
        let temp = project("test", true);
        native_prep(&temp)
            .arg("validate")
            .assert()
            .code(1)
            .stdout(contains("✗ Run tests failed"))
            .stdout(contains("[ERROR] test broke"))
            .stdout(contains("Failed at 'Run tests'"));

        assert_eq!(calls(&temp), vec!["clean", "compile", "test"]);
        assert!(!temp.path().join("target/app-runner").exists());
    }

    #[test]
    fn missing_binary_fails_after_successful_build() {
        let temp = project("none", false);
        native_prep(&temp)
            .arg("validate")
            .assert()
            .code(1)
            .stdout(contains("All 4 build steps succeeded"))
            .stdout(contains("Native binary not found"));

        assert_eq!(calls(&temp), vec!["clean", "compile", "test", "package"]);
    }

    #[test]
    fn smoke_timeout_is_advisory() {
        let temp = project("none", true);
        native_prep(&temp)
            .arg("validate")
            .assert()
            .success()
            .stdout(contains("Native binary present"))
            .stdout(contains("Smoke test timed out (advisory)"))
            .stdout(contains("✓ Native build validated"));

        #[cfg(target_os = "linux")]
        {
            let pid = fs::read_to_string(temp.path().join("runner.pid")).unwrap();
            assert!(
                gone_within(pid.trim(), std::time::Duration::from_secs(2)),
                "runner {} kept running after the smoke timeout",
                pid.trim()
            );
        }
    }

    /// Zombies waiting for a reaper count as gone.
    #[cfg(target_os = "linux")]
    fn gone_within(pid: &str, limit: std::time::Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < limit {
            let alive = match fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => stat
                    .rsplit_once(')')
                    .is_none_or(|(_, rest)| !rest.trim_start().starts_with('Z')),
                Err(_) => false,
            };
            if !alive {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        false
    }
}
