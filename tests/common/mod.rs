#![allow(dead_code)]

use std::time::Duration;

pub use pipespawn_test_utils::builders::sh;
pub use pipespawn_test_utils::init_tracing;
pub use pipespawn_test_utils::io::{read_at_least, read_to_end_with_deadline};

/// Upper bound for anything a test waits on.
pub const DEADLINE: Duration = Duration::from_secs(5);

/// Whether `fd` is open in this process.
pub fn is_open(fd: i32) -> bool {
    // SAFETY: F_GETFD only inspects the descriptor table.
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}
