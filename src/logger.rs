//! Leveled stderr sink handed to the package descriptor.

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes package diagnostics to stderr with the CLI's glyphs and colors.
#[derive(Debug, Clone, Copy)]
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Warnings and errors only.
    pub const fn quiet() -> Self {
        Self::new(LevelFilter::Warn)
    }

    /// Picks the threshold from the CLI's `--quiet` / `--verbose` flags.
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::new(LevelFilter::Warn)
        } else if verbose {
            Self::new(LevelFilter::Debug)
        } else {
            Self::new(LevelFilter::Info)
        }
    }

    pub const fn level(self) -> LevelFilter {
        self.level
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let glyph = match record.level() {
            Level::Error => "✗".red(),
            Level::Warn => "⚠".yellow(),
            Level::Info => "ℹ".blue(),
            Level::Debug | Level::Trace => "·".dimmed(),
        };

        if record.level() >= Level::Debug {
            eprintln!("{} {}", glyph, record.args().to_string().dimmed());
        } else {
            eprintln!("{} {}", glyph, record.args());
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(logger: &StderrLogger, level: Level) -> bool {
        logger.enabled(&Metadata::builder().level(level).build())
    }

    #[test]
    fn test_quiet_only_warns() {
        let logger = StderrLogger::from_flags(true, true);
        assert!(enabled(&logger, Level::Warn));
        assert!(!enabled(&logger, Level::Info));
    }

    #[test]
    fn test_default_is_info() {
        let logger = StderrLogger::from_flags(false, false);
        assert!(enabled(&logger, Level::Info));
        assert!(!enabled(&logger, Level::Debug));
    }

    #[test]
    fn test_verbose_shows_debug() {
        let logger = StderrLogger::from_flags(false, true);
        assert_eq!(logger.level(), LevelFilter::Debug);
        assert!(enabled(&logger, Level::Debug));
        assert!(!enabled(&logger, Level::Trace));
    }
}
