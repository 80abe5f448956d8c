use std::sync::atomic::{AtomicU8, Ordering};

/// How much the store and the binaries print. Warnings and errors go to
/// stderr at every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet = 0,
    /// Plus one status line per store write
    Normal = 1,
    /// Plus key counts, loads and merge details
    Debug = 2,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        1 => Verbosity::Normal,
        _ => Verbosity::Debug,
    }
}

/// Level from the `--quiet`/`--debug` flags; `--debug` wins.
pub fn set_from_flags(quiet: bool, debug: bool) {
    let level = if debug {
        Verbosity::Debug
    } else if quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    set_verbosity(level);
}

pub fn is_debug_enabled() -> bool {
    verbosity() >= Verbosity::Debug
}

pub fn is_status_enabled() -> bool {
    verbosity() >= Verbosity::Normal
}

/// Store status line ("Appended 3 new rows to ..."), silent under `--quiet`.
#[macro_export]
macro_rules! status_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_status_enabled() {
            println!($($arg)*);
        }
    };
}

/// Print to stdout only when `--debug` was given.
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! warn_eprintln {
    ($($arg:tt)*) => {
        eprintln!("[WARN] {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! error_eprintln {
    ($($arg:tt)*) => {
        eprintln!("[ERROR] {}", format!($($arg)*));
    };
}
