//! Abstraction over running `netsh`.
//!
//! [`CommandRunner`] lets the executor swap the real process launch for a
//! mock in tests, since `netsh` only exists on Windows.

use crate::config;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::process::Command;
use tracing::{debug, error};

/// Exit status and merged stdout + stderr of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub text: String,
}

impl CommandOutput {
    pub fn new(success: bool, text: impl Into<String>) -> Self {
        Self {
            success,
            text: text.into(),
        }
    }
}

/// Runs an external program and captures its output.
///
/// Implementations never fail: a launch error is reported as an
/// unsuccessful [`CommandOutput`] carrying the error message.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: Vec<String>) -> CommandOutput;
}

/// Default implementation backed by [`std::process::Command`]
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: Vec<String>) -> CommandOutput {
        debug!("Running {program} {}", args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(&args);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::CREATE_NO_WINDOW;
            cmd.creation_flags(CREATE_NO_WINDOW.0);
        }

        match cmd.output() {
            Ok(output) => {
                let mut text = decode_output(&output.stdout).into_owned();
                text.push_str(&decode_output(&output.stderr));
                CommandOutput {
                    success: output.status.success(),
                    text,
                }
            }
            Err(e) => {
                error!("Failed to run {program}: {e}");
                CommandOutput::new(false, e.to_string())
            }
        }
    }
}

/// Decode console output using the first candidate encoding that accepts
/// the bytes without errors, falling back to a lossy decode with the first
/// candidate.
pub fn decode_output(bytes: &[u8]) -> Cow<'_, str> {
    let candidates: Vec<&'static Encoding> = config::OUTPUT_ENCODINGS
        .iter()
        .filter_map(|label| Encoding::for_label(label.as_bytes()))
        .collect();

    for encoding in &candidates {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return text;
        }
    }

    match candidates.first() {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0,
        None => String::from_utf8_lossy(bytes),
    }
}
