#![cfg(target_os = "linux")]

mod common;

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use form_mirror::browser::loader::{LoadOptions, load_document};
use form_mirror::browser::session::{BrowserSession, navigation_deadline};
use form_mirror::error::{LoadPhase, NavigationError, SessionError};
use form_mirror::schema::assembler::SchemaAssembler;

const READY: &str = r#"echo '{"ok":true,"ready":true}'"#;

/// A driver started through `sh -c`, recording its pid before `script` runs.
/// `exec` keeps the recorded pid for whatever the script ends in.
fn shell_driver(pid_file: &Path, script: &str) -> Command {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(format!("echo $$ > {}; {}", pid_file.display(), script));
    command
}

fn read_pid(pid_file: &Path) -> u32 {
    std::fs::read_to_string(pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

/// Reaped processes leave no `/proc` entry, not even a zombie.
fn is_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

fn launch_err(command: Command) -> SessionError {
    match BrowserSession::launch_command(command, "test-driver") {
        Ok(_) => panic!("expected the launch to fail"),
        Err(e) => e,
    }
}

// =========================================================================
// Startup handshake
// =========================================================================

#[test]
fn driver_killed_when_ready_line_is_not_json() {
    let pid_file = common::temp_path("garbled.pid");
    let err = launch_err(shell_driver(&pid_file, "echo 'not json'; exec sleep 30"));

    assert!(matches!(err, SessionError::JsonParse { .. }), "{}", err);
    assert!(!is_running(read_pid(&pid_file)));

    std::fs::remove_file(&pid_file).ok();
}

#[test]
fn driver_killed_when_ready_flag_missing() {
    let pid_file = common::temp_path("unready.pid");
    let err = launch_err(shell_driver(&pid_file, r#"echo '{"ok":true}'; exec sleep 30"#));

    assert!(matches!(err, SessionError::Protocol { .. }), "{}", err);
    assert!(!is_running(read_pid(&pid_file)));

    std::fs::remove_file(&pid_file).ok();
}

#[test]
fn driver_exiting_before_ready_is_an_io_error() {
    let pid_file = common::temp_path("early-exit.pid");
    let err = launch_err(shell_driver(&pid_file, "exit 3"));

    assert!(matches!(err, SessionError::Io(_)), "{}", err);
    assert!(!is_running(read_pid(&pid_file)));

    std::fs::remove_file(&pid_file).ok();
}

#[test]
fn missing_driver_binary_is_a_spawn_error() {
    let err = launch_err(Command::new("/nonexistent/form-driver"));
    assert!(matches!(err, SessionError::Spawn { .. }), "{}", err);
}

// =========================================================================
// Deadlines
// =========================================================================

#[test]
fn hung_navigation_times_out_and_driver_is_killed() {
    let pid_file = common::temp_path("hung.pid");
    let command = shell_driver(&pid_file, &format!("{}; exec sleep 30", READY));
    let mut session = match BrowserSession::launch_command(command, "hung-driver") {
        Ok(session) => session,
        Err(e) => panic!("launch failed: {}", e),
    };
    let pid = session.driver_pid();

    let options = LoadOptions {
        navigation_timeout: Duration::from_millis(100),
        ready_timeout: Duration::from_millis(100),
        ..LoadOptions::default()
    };
    let err = match load_document(
        &mut session,
        "https://x.test",
        &options,
    ) {
        Ok(()) => panic!("expected a timeout"),
        Err(e) => e,
    };

    match err {
        NavigationError::Timeout { phase, limit_ms } => {
            assert_eq!(phase, LoadPhase::Navigation);
            assert_eq!(limit_ms, 1200);
        }
        other => panic!("unexpected {:?}", other),
    }

    drop(session);
    assert!(!is_running(pid));

    std::fs::remove_file(&pid_file).ok();
}

#[test]
fn navigation_deadline_covers_both_driver_waits() {
    let options = LoadOptions {
        navigation_timeout: Duration::from_secs(30),
        ready_timeout: Duration::from_secs(10),
        ..LoadOptions::default()
    };
    assert_eq!(navigation_deadline(&options), Duration::from_secs(41));
}

// =========================================================================
// Full run through a scripted driver
// =========================================================================

const SCRIPTED_DRIVER: &str = r#"
echo '{"ok":true,"ready":true}'
while read -r line; do
  case "$line" in
    *'"navigate"'*) echo '{"ok":true}' ;;
    *'"dom"'*) echo '{"ok":true,"data":{"nodes":[{"tag":"form","props":{"id":"f"}},{"tag":"input","parent":0,"attributes":[["id","a"]],"props":{"id":"a","type":"text","maxLength":12}}]}}' ;;
    *'"styles"'*) echo '{"ok":true,"data":[{"kind":"unreadable"}]}' ;;
    *'"layout"'*) echo '{"ok":true,"data":{"width":1366,"height":768,"title":"Scripted"}}' ;;
    *'"quit"'*) exit 0 ;;
  esac
done
"#;

#[test]
fn scripted_driver_runs_whole_pipeline() {
    let pid_file = common::temp_path("scripted.pid");
    let output = common::temp_path("scripted.json");
    let session = match BrowserSession::launch_command(
        shell_driver(&pid_file, SCRIPTED_DRIVER),
        "scripted-driver",
    ) {
        Ok(session) => session,
        Err(e) => panic!("launch failed: {}", e),
    };
    let pid = session.driver_pid();

    let schema = SchemaAssembler::new("https://x.test/form", &output)
        .run(session)
        .unwrap();

    assert_eq!(schema.fields.len(), 1);
    assert_eq!(schema.fields[0].id, "a");
    assert_eq!(schema.fields[0].max_length, Some(12));
    assert_eq!(schema.structure.form.as_ref().unwrap().id, "f");
    assert_eq!(schema.structure.styles, "");
    assert_eq!(schema.structure.layout.title, "Scripted");
    assert!(output.exists());
    assert!(!is_running(pid));

    std::fs::remove_file(&pid_file).ok();
    std::fs::remove_file(&output).ok();
}
