// tests/spawn_scenarios.rs
mod common;
use crate::common::{init_tracing, read_at_least, read_to_end_with_deadline, sh, DEADLINE};

use std::error::Error;
use std::io::{Read, Write};

use pipespawn::{ProcessBuilder, ProcessError, Signal, Spawnable};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn echo_hello_yields_hello_and_exit_zero() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "echo hello"])?.start()?;

    let mut hello = [0u8; 5];
    let mut stdout = child.stdout().expect("stdout endpoint");
    stdout.read_exact(&mut hello)?;
    assert_eq!(&hello, b"hello");

    let status = child.wait()?;
    assert_eq!(status.code(), Some(0));
    assert!(status.success());
    Ok(())
}

#[test]
fn environment_entry_reaches_child() -> TestResult {
    init_tracing();

    let mut builder = ProcessBuilder::new(["/bin/sh", "-c", "echo \"$VAR\""])?;
    builder
        .environment()
        .insert("VAR".into(), "secret".into());
    let child = builder.start()?;

    let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
    assert_eq!(out, b"secret\n");
    assert!(child.wait()?.success());
    Ok(())
}

#[test]
fn longer_environment_value_round_trips() -> TestResult {
    init_tracing();

    let value = "environment variable";
    let mut builder = sh("echo \"$envVar\"");
    builder.env("envVar", value);
    let child = builder.start()?;

    let mut message = vec![0u8; value.len()];
    child.stdout().expect("stdout").read_exact(&mut message)?;
    assert_eq!(message, value.as_bytes());
    assert_eq!(child.wait()?.code(), Some(0));
    Ok(())
}

#[test]
fn cat_echoes_then_dies_by_signal() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "cat"])?.start()?;

    child.stdin().expect("stdin").write_all(b"hello")?;
    let echoed = read_at_least(child.stdout().expect("stdout"), 5, DEADLINE)?;
    assert_eq!(echoed, b"hello");

    assert_eq!(child.kill(), Ok(()));
    let status = child.wait()?;
    assert_eq!(status.code(), None);
    assert_eq!(status.terminating_signal(), Some(Signal::SIGKILL));

    // The status is absorbing, and a reaped pid is never signalled again.
    assert_eq!(child.exit_value()?, status);
    assert!(child.kill().is_err());
    Ok(())
}

#[test]
fn caller_chosen_signal_is_reported() -> TestResult {
    init_tracing();

    let child = sh("echo up; exec sleep 30").start()?;
    read_at_least(child.stdout().expect("stdout"), 3, DEADLINE)?;

    child.signal(Signal::SIGTERM).map_err(|e| format!("kill failed: {e}"))?;
    let status = child.wait()?;
    assert_eq!(status.terminating_signal(), Some(Signal::SIGTERM));
    Ok(())
}

#[test]
fn nonzero_exit_code_and_stderr_are_separate() -> TestResult {
    init_tracing();

    let child = sh("echo out; echo err >&2; exit 7").start()?;

    let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
    let err = read_to_end_with_deadline(child.stderr().expect("stderr"), DEADLINE)?;
    assert_eq!(out, b"out\n");
    assert_eq!(err, b"err\n");

    let status = child.wait()?;
    assert_eq!(status.code(), Some(7));
    assert!(!status.success());
    Ok(())
}

#[test]
fn closing_stdin_delivers_eof() -> TestResult {
    init_tracing();

    let mut child = sh("wc -c").start()?;
    {
        let mut stdin = child.take_stdin().expect("stdin");
        stdin.write_all(b"twelve bytes")?;
    }

    let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
    assert_eq!(String::from_utf8(out)?.trim(), "12");
    assert!(child.wait()?.success());
    Ok(())
}

#[test]
fn program_is_found_through_path() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["sh", "-c", "printf found"])?.start()?;
    let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
    assert_eq!(out, b"found");
    assert!(child.wait()?.success());
    Ok(())
}

#[test]
fn missing_executable_is_spawn_failed() -> TestResult {
    init_tracing();

    let result = ProcessBuilder::new(["/definitely/not/a/program"])?.start();
    match result {
        Err(ProcessError::SpawnFailed { program, source }) => {
            assert_eq!(program, "/definitely/not/a/program");
            assert_eq!(source.raw_os_error(), Some(libc::ENOENT));
        }
        Err(e) => panic!("Expected SpawnFailed, got: {:?}", e),
        Ok(child) => panic!("Expected error, spawned pid {}", child.id()),
    }
    Ok(())
}

#[test]
fn working_directory_applies_to_child_only() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let before = std::env::current_dir()?;

    let mut builder = sh("pwd -P");
    builder.set_directory(dir.path());
    assert_eq!(builder.directory()?, dir.path());

    let child = builder.start()?;
    let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
    assert!(child.wait()?.success());

    let reported = String::from_utf8(out)?;
    assert_eq!(
        std::path::Path::new(reported.trim()),
        dir.path().canonicalize()?
    );
    assert_eq!(std::env::current_dir()?, before);
    Ok(())
}

#[test]
fn missing_working_directory_fails_the_spawn() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let gone = dir.path().join("gone");

    let mut builder = sh("true");
    builder.set_directory(&gone);
    match builder.start() {
        Err(ProcessError::SpawnFailed { source, .. }) => {
            assert_eq!(source.raw_os_error(), Some(libc::ENOENT));
        }
        Err(e) => panic!("Expected SpawnFailed, got: {:?}", e),
        Ok(child) => panic!("Expected error, spawned pid {}", child.id()),
    }
    Ok(())
}

#[test]
fn builder_can_spawn_repeatedly_through_the_trait() -> TestResult {
    init_tracing();

    let builder = sh("printf x");
    let spawner: &dyn Spawnable = &builder;
    for _ in 0..3 {
        let child = spawner.spawn()?;
        let out = read_to_end_with_deadline(child.stdout().expect("stdout"), DEADLINE)?;
        assert_eq!(out, b"x");
        assert!(child.wait()?.success());
    }
    Ok(())
}

#[test]
fn sigpipe_is_default_in_child() -> TestResult {
    init_tracing();

    // With stdout's reader gone, `yes` must die from SIGPIPE instead of
    // looping on EPIPE forever.
    let mut child = ProcessBuilder::new(["yes"])?.start()?;
    drop(child.take_stdout());

    let status = child.wait()?;
    assert_eq!(status.terminating_signal(), Some(Signal::SIGPIPE));
    Ok(())
}
