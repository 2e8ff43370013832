// tests/stdout_fidelity.rs
mod common;
use crate::common::{init_tracing, read_to_end_with_deadline, sh, DEADLINE};

use std::io::Write;

use pipespawn::ProcessBuilder;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever goes into `cat` comes back out unchanged.
    #[test]
    fn cat_returns_input_bytes(input in proptest::collection::vec(any::<u8>(), 0..2048)) {
        init_tracing();

        let mut child = ProcessBuilder::new(["cat"]).unwrap().start().unwrap();
        {
            let mut stdin = child.take_stdin().unwrap();
            stdin.write_all(&input).unwrap();
        }
        let out = read_to_end_with_deadline(child.stdout().unwrap(), DEADLINE).unwrap();
        prop_assert_eq!(out, input);
        prop_assert!(child.wait().unwrap().success());
    }

    /// Arguments reach the program as-is, without shell re-interpretation.
    #[test]
    fn argument_bytes_are_preserved(arg in r"[^\x00]{0,64}") {
        init_tracing();

        let mut builder = sh("printf '%s' \"$1\"");
        let mut command = builder.command();
        command.push("sh".into());
        command.push(arg.clone().into());
        builder.set_command(command).unwrap();

        let child = builder.start().unwrap();
        let out = read_to_end_with_deadline(child.stdout().unwrap(), DEADLINE).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), arg);
        prop_assert!(child.wait().unwrap().success());
    }

    /// Environment values survive the trip into the child.
    #[test]
    fn environment_values_are_preserved(value in r"[^\x00]{0,64}") {
        init_tracing();

        let mut builder = sh("printf '%s' \"$PIPESPAWN_VALUE\"");
        builder.env("PIPESPAWN_VALUE", &value);

        let child = builder.start().unwrap();
        let out = read_to_end_with_deadline(child.stdout().unwrap(), DEADLINE).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), value);
        prop_assert!(child.wait().unwrap().success());
    }
}
