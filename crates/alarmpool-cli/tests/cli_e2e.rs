//! CLI E2E tests.
//!
//! Each test runs the compiled binary with piped stdin, feeds it request
//! lines, keeps the pipe open long enough for the 1 s cadence to do its
//! work, then closes stdin (EOF) and inspects the captured output.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Spawn the binary via cargo with stdin piped.
fn spawn_cli() -> Child {
    Command::new("cargo")
        .args(["run", "-p", "alarmpool-cli", "--quiet", "--", "--no-prompt"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI binary")
}

/// Write `lines`, wait `hold` with the pipe open, then EOF and collect output.
fn drive(lines: &[&str], hold: Duration) -> (String, String, i32) {
    let mut child = spawn_cli();
    {
        let stdin = child.stdin.as_mut().expect("stdin piped");
        for line in lines {
            writeln!(stdin, "{line}").expect("write request line");
        }
        stdin.flush().expect("flush stdin");
        std::thread::sleep(hold);
    }
    drop(child.stdin.take());
    let output = child.wait_with_output().expect("collect CLI output");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn start_alarm_prints_and_expires() {
    let (stdout, _stderr, code) = drive(&["Start_Alarm(1): 7 3 1 hello"], Duration::from_secs(6));

    assert_eq!(code, 0);
    assert!(stdout.contains("Start_Alarm(1) Request Inserted"), "{stdout}");
    assert!(stdout.contains("Assigned to Display Thread"), "{stdout}");
    assert!(stdout.contains("Printed"), "{stdout}");
    assert!(stdout.contains("hello"), "{stdout}");
    assert!(stdout.contains("Expired"), "{stdout}");
}

#[test]
fn view_lists_the_active_alarm() {
    let (stdout, _stderr, code) = drive(
        &["Start_Alarm(2): 5 30 2 tick", "View_Alarms"],
        Duration::from_secs(3),
    );

    assert_eq!(code, 0);
    assert!(stdout.contains("Alarm Requests Viewed"), "{stdout}");
    assert!(stdout.contains("Alarm(2): Group(5)"), "{stdout}");
}

#[test]
fn bad_command_is_diagnosed_on_stderr_and_ignored() {
    let (stdout, stderr, code) = drive(
        &["Ring_Bell(1)", "Start_Alarm(0): 1 1 1 x"],
        Duration::from_secs(2),
    );

    assert_eq!(code, 0);
    assert!(stderr.contains("bad command"), "{stderr}");
    assert!(!stdout.contains("Inserted"), "{stdout}");
}

#[test]
fn eof_without_input_exits_zero() {
    let (stdout, _stderr, code) = drive(&[], Duration::from_millis(300));
    assert_eq!(code, 0);
    assert!(stdout.is_empty(), "{stdout}");
}
