mod common;

use common::{run_audiotracer, stderr_of, stdout_of, TestEnv};

#[test]
fn audiotracer_help_shows_usage() {
    let output = run_audiotracer(&["--help"]);
    let stdout = stdout_of(&output);
    let stderr = stderr_of(&output);

    assert!(
        output.status.success(),
        "--help should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("Commands:"));
    for command in ["start", "pause", "resume", "stop", "storage"] {
        assert!(stdout.contains(command), "help should list `{}`", command);
    }
    assert!(
        !stderr.contains("No config file found"),
        "--help should not log config fallback noise\nstderr:\n{}",
        stderr
    );
}

#[test]
fn audiotracer_version_shows_version() {
    let output = run_audiotracer(&["--version"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success());
    assert!(stdout.contains("audiotracer "));
}

#[test]
fn completions_bash_outputs_script() {
    let output = run_audiotracer(&["completions", "bash"]);
    let stdout = stdout_of(&output);

    assert!(
        output.status.success(),
        "completions bash should succeed\nstderr:\n{}",
        stderr_of(&output)
    );
    assert!(
        stdout.contains("audiotracer"),
        "expected completion output to reference command name\nstdout:\n{}",
        stdout
    );
}

#[test]
fn config_show_works() {
    let output = run_audiotracer(&["config", "show"]);
    let stdout = stdout_of(&output);

    assert!(
        output.status.success(),
        "config show should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr_of(&output)
    );
    assert!(stdout.contains("[general]"));
    assert!(stdout.contains("data_dir"));
    assert!(stdout.contains("bitrate = 128000"));
}

#[test]
fn config_path_returns_valid_path() {
    let output = run_audiotracer(&["config", "path"]);

    assert!(output.status.success());
    assert!(stdout_of(&output).contains("config.toml"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let env = TestEnv::new();

    let first = env.run(&["config", "init"]);
    assert!(
        first.status.success(),
        "first init should succeed\nstderr:\n{}",
        stderr_of(&first)
    );
    assert!(env.config_path().exists());

    let second = env.run(&["config", "init"]);
    assert!(!second.status.success());
    assert!(stderr_of(&second).contains("--force"));

    let forced = env.run(&["config", "init", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn list_works_with_empty_directory() {
    let output = run_audiotracer(&["list"]);
    let stdout = stdout_of(&output);

    assert!(
        output.status.success(),
        "list should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr_of(&output)
    );
    assert!(stdout.contains("No recordings found"));
}

#[test]
fn list_shows_daily_files() {
    let env = TestEnv::new();
    let recordings = env.data_dir().join("recordings");
    std::fs::create_dir_all(&recordings).unwrap();
    std::fs::write(recordings.join("2024-01-01.m4a"), b"aac").unwrap();
    std::fs::write(recordings.join("notes.txt"), b"not audio").unwrap();
    env.write_config(&format!(
        "[storage]\nrecordings_dir = \"{}\"\n",
        recordings.display()
    ));

    let output = env.run(&["list"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "stderr:\n{}", stderr_of(&output));
    assert!(stdout.contains("2024-01-01.m4a"));
    assert!(!stdout.contains("notes.txt"));
}

#[test]
fn daemon_status_reports_not_running() {
    let output = run_audiotracer(&["daemon", "status"]);
    let stdout = stdout_of(&output);

    assert!(
        output.status.success(),
        "daemon status should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr_of(&output)
    );
    assert!(stdout.contains("Daemon is not running"));
}

#[test]
fn status_falls_back_to_probe_without_daemon() {
    let output = run_audiotracer(&["status"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "stderr:\n{}", stderr_of(&output));
    assert!(stdout.contains("Daemon is not running"));
    assert!(stdout.contains("Status: Stopped"));
}

#[test]
fn start_without_daemon_fails_with_hint() {
    let output = run_audiotracer(&["start"]);

    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("daemon start"));
}

#[test]
fn storage_works_without_daemon() {
    let output = run_audiotracer(&["storage"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "stderr:\n{}", stderr_of(&output));
    assert!(stdout.contains("Free:"));
    assert!(stdout.contains("Time left:"));
}

#[test]
fn permissions_reports_missing_grants() {
    let env = TestEnv::new();
    env.write_config("[platform]\nlevel = 34\ngranted = [\"record_audio\"]\n");

    let output = env.run(&["permissions"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "stderr:\n{}", stderr_of(&output));
    assert!(stdout.contains("post_notifications"));
    assert!(stdout.contains("missing"));
    assert!(!stdout.contains("All required permissions granted"));
}

#[test]
fn permissions_all_granted_by_default() {
    let output = run_audiotracer(&["permissions"]);

    assert!(output.status.success());
    assert!(stdout_of(&output).contains("All required permissions granted"));
}
