//! User-facing SDK output. Library diagnostics go through the `log` facade
//! instead; this is what an extension prints on purpose.

use std::fmt::Display;
use std::io::{self, Write};

/// Prefix on every line an extension prints through the SDK.
pub const PREFIX: &str = "[SAKURA-SDK] >";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Output,
    Debug,
    Warn,
    Error,
}

impl Channel {
    fn label(self) -> Option<&'static str> {
        match self {
            Channel::Output => None,
            Channel::Debug => Some("DEBUG"),
            Channel::Warn => Some("WARN"),
            Channel::Error => Some("ERROR"),
        }
    }

    /// ANSI SGR color for the prefix.
    fn color(self) -> u8 {
        match self {
            Channel::Output => 95,
            Channel::Debug => 90,
            Channel::Warn => 93,
            Channel::Error => 91,
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Channel::Warn | Channel::Error)
    }
}

fn emit(channel: Channel, message: impl Display) {
    let line = format_prefixed(channel, message, std::env::var_os("NO_COLOR").is_none());
    // Write errors are dropped.
    let _ = if channel.to_stderr() {
        writeln!(io::stderr().lock(), "{line}")
    } else {
        writeln!(io::stdout().lock(), "{line}")
    };
}

pub fn output(message: impl Display) {
    emit(Channel::Output, message);
}

/// Shown only in debug builds of the bridge.
pub fn debug_output(message: impl Display) {
    if cfg!(debug_assertions) {
        emit(Channel::Debug, message);
    }
}

pub fn warn(message: impl Display) {
    emit(Channel::Warn, message);
}

pub fn error(message: impl Display) {
    emit(Channel::Error, message);
}

fn format_prefixed(channel: Channel, message: impl Display, with_color: bool) -> String {
    let tag = match channel.label() {
        Some(label) => format!("{PREFIX} [{label}]"),
        None => PREFIX.to_string(),
    };
    if with_color {
        format!("\x1b[{}m{tag}\x1b[0m {message}", channel.color())
    } else {
        format!("{tag} {message}")
    }
}
