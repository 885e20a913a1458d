//! Terminal output formatting for the camo CLI.
//!
//! Provides Cargo-style status output with right-aligned coloured verbs.
//! All status output goes to stderr; stdout is reserved for machine-readable output.
//! The same printer doubles as the `log` backend so pipeline warnings share the format.

use std::io::{self, IsTerminal, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::diagnostics::{Diagnostic, Severity};
use crate::types::Colour;

/// ANSI escape codes.
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Width for right-aligned verb column.
const VERB_WIDTH: usize = 12;

/// Terminal-aware status printer.
///
/// Prints Cargo-style status lines to stderr with optional ANSI colours.
/// Colour is enabled when stderr is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    /// A printer that never emits escape codes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Print a status line with a green bold verb.
    /// e.g. "  Processing forest.jpg (1024x768)"
    pub fn status(&self, verb: &str, message: &str) {
        self.print_line(GREEN, verb, message);
    }

    /// Print an informational line with a cyan bold verb.
    pub fn info(&self, verb: &str, message: &str) {
        self.print_line(CYAN, verb, message);
    }

    /// Print a warning line with a yellow bold verb.
    pub fn warning(&self, verb: &str, message: &str) {
        self.print_line(YELLOW, verb, message);
    }

    /// Print an error line with a red bold verb.
    pub fn error(&self, verb: &str, message: &str) {
        self.print_line(RED, verb, message);
    }

    /// Print a pipeline diagnostic, with its help text dimmed underneath.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        let is_error = diagnostic.severity == Severity::Error;
        let label = diagnostic.severity.to_string();
        let message = match diagnostic.layer {
            Some(layer) => format!("layer {}: {} [{}]", layer, diagnostic.message, diagnostic.code),
            None => format!("{} [{}]", diagnostic.message, diagnostic.code),
        };
        if is_error {
            self.error(&label, &message);
        } else {
            self.warning(&label, &message);
        }
        if let Some(help) = &diagnostic.help {
            self.print_plain(&format!("{:>VERB_WIDTH$} {}", "", self.dim(help)));
        }
    }

    /// Format a string as dim/grey.
    pub fn dim(&self, text: &str) -> String {
        if self.color {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Format a string as bold.
    pub fn bold(&self, text: &str) -> String {
        if self.color {
            format!("{BOLD}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Format a string as cyan (for paths, info).
    pub fn cyan(&self, text: &str) -> String {
        if self.color {
            format!("{CYAN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Render a colour swatch followed by its hex code.
    ///
    /// With colour enabled this uses a 24-bit background, picking black or
    /// white text for legibility.
    pub fn swatch(&self, rgb: [u8; 3], label: &str) -> String {
        if !self.color {
            return label.to_string();
        }
        let [r, g, b] = rgb;
        let fg = if Colour::from_rgb(rgb).is_bright() { "30" } else { "97" };
        format!("\x1b[48;2;{r};{g};{b}m\x1b[{fg}m {label} {RESET}")
    }

    fn print_line(&self, color: &str, verb: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        if self.color {
            let _ = writeln!(
                stderr,
                "{BOLD}{color}{verb:>VERB_WIDTH$}{RESET} {message}"
            );
        } else {
            let _ = writeln!(stderr, "{verb:>VERB_WIDTH$} {message}");
        }
    }

    fn print_plain(&self, line: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

impl Log for Printer {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        match record.level() {
            Level::Error => self.error("error", &message),
            Level::Warn => self.warning("warning", &message),
            Level::Info => self.info("info", &message),
            Level::Debug | Level::Trace => self.print_line(DIM, "debug", &message),
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Route `log` records through a [`Printer`].
///
/// Safe to call more than once; later calls only adjust the level.
pub fn install_logger(level: LevelFilter) {
    let _ = log::set_boxed_logger(Box::new(Printer::new()));
    log::set_max_level(level);
}

/// Pluralize a count: `plural(1, "layer", "layers")` → "1 layer".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, pluralized)
    }
}

/// Return a relative display path when possible, absolute otherwise.
pub fn display_path(path: &std::path::Path) -> String {
    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(relative) = path.strip_prefix(&cwd) {
            let s = relative.display().to_string();
            if s.is_empty() {
                return ".".to_string();
            }
            return s;
        }
    }
    path.display().to_string()
}
