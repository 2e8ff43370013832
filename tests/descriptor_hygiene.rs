// tests/descriptor_hygiene.rs

// A single test on purpose: descriptor numbers are process-wide, and a
// parallel test in the same binary could reuse a number we check.
mod common;
use crate::common::{init_tracing, is_open};

use std::collections::BTreeSet;
use std::error::Error;
use std::os::fd::AsRawFd;
use std::sync::Arc;

use pipespawn::sys::mock::MockPosix;
use pipespawn::{ProcessBuilder, ProcessError};

type TestResult = Result<(), Box<dyn Error>>;

fn builder_with(mock: &MockPosix, script: &str) -> Result<ProcessBuilder, ProcessError> {
    ProcessBuilder::with_posix(["/bin/sh", "-c", script], Arc::new(mock.clone()))
}

#[test]
fn no_descriptor_outlives_its_owner() -> TestResult {
    init_tracing();

    // Third pipe fails: the first two must be closed again.
    let mock = MockPosix::new();
    mock.fail_pipe_at(3, libc::EMFILE);
    let result = builder_with(&mock, "true")?.start();
    assert!(matches!(result, Err(ProcessError::ResourceExhausted(_))));
    assert_eq!(mock.pipe_calls(), 3);
    assert!(!mock.issued_fds().is_empty());
    for fd in mock.issued_fds() {
        assert!(!is_open(fd), "fd {fd} leaked after pipe failure");
    }

    // Spawn fails after all six ends exist.
    let mock = MockPosix::new();
    mock.fail_spawn(libc::EACCES);
    let result = builder_with(&mock, "true")?.start();
    match result {
        Err(ProcessError::SpawnFailed { source, .. }) => {
            assert_eq!(source.raw_os_error(), Some(libc::EACCES))
        }
        other => panic!("Expected SpawnFailed, got: {:?}", other.map(|c| c.id())),
    }
    for fd in mock.issued_fds() {
        assert!(!is_open(fd), "fd {fd} leaked after spawn failure");
    }

    // Success: exactly the three parent ends stay open.
    let mock = MockPosix::new();
    let child = builder_with(&mock, "exit 0")?.start()?;
    let kept: BTreeSet<i32> = [
        child.stdin().expect("stdin").as_raw_fd(),
        child.stdout().expect("stdout").as_raw_fd(),
        child.stderr().expect("stderr").as_raw_fd(),
    ]
    .into_iter()
    .collect();
    assert_eq!(kept.len(), 3);
    for fd in &kept {
        assert!(*fd > libc::STDERR_FILENO);
        assert!(is_open(*fd));
    }
    let open: BTreeSet<i32> = mock
        .issued_fds()
        .into_iter()
        .filter(|fd| is_open(*fd))
        .collect();
    assert_eq!(open, kept);

    // The child's ends were passed down and closed in the parent, so its
    // exit is visible as EOF. Dropping the handle closes the rest.
    assert!(child.wait()?.success());
    drop(child);
    for fd in &kept {
        assert!(!is_open(*fd), "fd {fd} leaked after drop");
    }
    Ok(())
}
