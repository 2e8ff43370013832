// tests/polling.rs
mod common;
use crate::common::{init_tracing, read_at_least, DEADLINE};

use std::error::Error;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use pipespawn::{Interest, ProcessBuilder, Selector, Token};

type TestResult = Result<(), Box<dyn Error>>;

const STDOUT: Token = Token(1);
const STDERR: Token = Token(2);
const STDIN: Token = Token(3);

#[test]
fn selector_reports_the_stream_that_has_data() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "printf only-err >&2; read line"])?.start()?;
    let stdout = child.stdout().expect("stdout");
    let stderr = child.stderr().expect("stderr");

    let selector = Selector::new()?;
    stdout.register(&selector, STDOUT)?;
    stderr.register(&selector, STDERR)?;
    assert_eq!(selector.len(), 2);

    let events = selector.select(Some(DEADLINE))?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].token(), STDERR);
    assert!(events[0].is_readable());

    let mut buf = [0u8; 16];
    let n = (&*stderr).read(&mut buf)?;
    assert_eq!(&buf[..n], b"only-err");

    child.kill_process_group().map_err(|e| format!("kill failed: {e}"))?;
    child.wait()?;
    Ok(())
}

#[test]
fn empty_select_times_out() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "read line"])?.start()?;
    let stdout = child.stdout().expect("stdout");

    let selector = Selector::new()?;
    stdout.register(&selector, STDOUT)?;
    let started = Instant::now();
    let events = selector.select(Some(Duration::from_millis(50)))?;
    assert!(events.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(40));

    child.kill().map_err(|e| format!("kill failed: {e}"))?;
    child.wait()?;
    Ok(())
}

#[test]
fn stdin_is_writable_and_round_trips_through_cat() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["cat"])?.start()?;
    let stdin = child.stdin().expect("stdin");

    let selector = Selector::new()?;
    stdin.register(&selector, STDIN)?;
    let events = selector.select(Some(DEADLINE))?;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_writable());
    assert_eq!(events[0].token(), STDIN);

    stdin.set_nonblocking(true)?;
    assert!(stdin.is_nonblocking()?);
    (&*stdin).write_all(b"ping\n")?;

    let echoed = read_at_least(child.stdout().expect("stdout"), 5, DEADLINE)?;
    assert_eq!(echoed, b"ping\n");

    stdin.deregister(&selector)?;
    assert!(selector.is_empty());
    child.kill().map_err(|e| format!("kill failed: {e}"))?;
    child.wait()?;
    Ok(())
}

#[test]
fn nonblocking_read_on_quiet_child_would_block() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "read line"])?.start()?;
    let stdout = child.stdout().expect("stdout");
    assert!(!stdout.is_nonblocking()?);
    stdout.set_nonblocking(true)?;

    let mut buf = [0u8; 8];
    let err = (&*stdout).read(&mut buf).expect_err("nothing written yet");
    assert_eq!(err.kind(), ErrorKind::WouldBlock);

    child.kill().map_err(|e| format!("kill failed: {e}"))?;
    child.wait()?;
    Ok(())
}

#[test]
fn registration_rules() -> TestResult {
    init_tracing();

    let child = ProcessBuilder::new(["/bin/sh", "-c", "exit 0"])?.start()?;
    let stdout = child.stdout().expect("stdout");
    let selector = Selector::new()?;

    let err = stdout.reregister(&selector, STDOUT).expect_err("not registered");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    selector.register(stdout, STDOUT, Interest::READABLE)?;
    let err = stdout.register(&selector, STDERR).expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    stdout.reregister(&selector, STDERR)?;
    let events = selector.select(Some(DEADLINE))?;
    assert_eq!(events[0].token(), STDERR);
    // The child exited without writing: readiness is EOF.
    assert!(events[0].is_readable());
    let mut buf = [0u8; 1];
    assert_eq!((&*stdout).read(&mut buf)?, 0);

    stdout.deregister(&selector)?;
    let err = stdout.deregister(&selector).expect_err("already gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(child.wait()?.success());
    Ok(())
}
