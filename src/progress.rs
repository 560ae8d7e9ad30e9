use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::workspace::OutputSink;

/// Phase reporting on top of the raw engine output.
pub trait Progress: OutputSink {
    fn as_sink(&self) -> &dyn OutputSink;

    fn start(&self, _message: &str) {}

    fn succeed(&self, _message: &str) {}

    fn fail(&self, _message: &str) {}
}

/// Terminal output: one spinner per phase. Engine lines replace each other on
/// the spinner, or are printed verbatim with `debug`.
pub struct ConsoleProgress {
    debug: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new(debug: bool) -> Self {
        return Self {
            debug,
            spinner: Mutex::new(None),
        };
    }

    fn finish(&self) -> bool {
        let mut spinner = match self.spinner.lock() {
            Ok(spinner) => spinner,
            Err(poisoned) => poisoned.into_inner(),
        };

        match spinner.take() {
            Some(bar) => {
                bar.finish_and_clear();
                true
            }
            None => false,
        }
    }

    fn with_spinner<F: FnOnce(Option<&ProgressBar>)>(&self, f: F) {
        let spinner = match self.spinner.lock() {
            Ok(spinner) => spinner,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(spinner.as_ref());
    }
}

/// Where one engine line ends up.
#[derive(Debug, PartialEq)]
enum Route {
    /// Printed on its own line, above the spinner if one is running.
    Print,
    /// Replaces the spinner message.
    Collapse(String),
    /// Blank lines leave the spinner message as it is.
    Drop,
}

fn route(line: &str, debug: bool, spinning: bool) -> Route {
    if debug || !spinning {
        return Route::Print;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Route::Drop;
    }

    return Route::Collapse(trimmed.to_string());
}

impl OutputSink for ConsoleProgress {
    fn line(&self, line: &str) {
        let debug = self.debug;
        self.with_spinner(|spinner| match (route(line, debug, spinner.is_some()), spinner) {
            (Route::Print, Some(bar)) => bar.suspend(|| println!("{}", line)),
            (Route::Print, None) => println!("{}", line),
            (Route::Collapse(message), Some(bar)) => bar.set_message(message),
            _ => {}
        });
    }

    /// Verbatim output is never cleared.
    fn clear(&self) {
        if self.debug {
            return;
        }
        self.with_spinner(|spinner| {
            if let Some(bar) = spinner {
                bar.set_message(String::new());
            }
        });
    }
}

impl Progress for ConsoleProgress {
    fn as_sink(&self) -> &dyn OutputSink {
        return self;
    }

    fn start(&self, message: &str) {
        self.finish();

        let bar = ProgressBar::new_spinner();
        let template = "{spinner:.cyan} {prefix:.bold.cyan} {wide_msg:.dim}";
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            let ticks = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"];
            bar.set_style(style.tick_strings(&ticks));
        }
        bar.set_prefix(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut spinner = match self.spinner.lock() {
            Ok(spinner) => spinner,
            Err(poisoned) => poisoned.into_inner(),
        };
        *spinner = Some(bar);
    }

    fn succeed(&self, message: &str) {
        self.finish();
        println!("{} {}", "✔".green().bold(), message.green().bold());
    }

    fn fail(&self, message: &str) {
        self.finish();
        eprintln!("{} {}", "✖".red().bold(), message.red().bold());
    }
}

/// Discards everything.
pub struct Quiet;

impl OutputSink for Quiet {
    fn line(&self, _line: &str) {}
}

impl Progress for Quiet {
    fn as_sink(&self) -> &dyn OutputSink {
        return self;
    }
}
