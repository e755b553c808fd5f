use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Colored stderr sink for the `log` facade.
pub struct StderrLogger {
    level: LevelFilter,
    choice: ColorChoice,
}

impl StderrLogger {
    pub fn install(level: LevelFilter, choice: ColorChoice) {
        let logger = Box::new(StderrLogger { level, choice });
        if log::set_boxed_logger(logger).is_ok() {
            log::set_max_level(level);
        }
    }
}

fn level_color(level: Level) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        Level::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
        Level::Warn => spec.set_fg(Some(Color::Yellow)).set_bold(true),
        Level::Info => spec.set_fg(Some(Color::Green)),
        Level::Debug => spec.set_fg(Some(Color::Blue)),
        Level::Trace => spec.set_fg(Some(Color::Magenta)),
    };
    spec
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stream = StandardStream::stderr(self.choice);
        // Nowhere left to report a failing stderr.
        let _ = stream.set_color(&level_color(record.level()));
        let _ = write!(stream, "{:>5}", record.level());
        let _ = stream.reset();
        let _ = writeln!(stream, " {}: {}", record.target(), record.args());
    }

    fn flush(&self) {
        let _ = StandardStream::stderr(self.choice).flush();
    }
}
