use core::fmt;

use spin::Once;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Critical = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str(match self {
                Self::Debug => "\x1b[32mDEBUG\x1b[0m",
                Self::Info => "\x1b[32mINFO\x1b[0m",
                Self::Warn => "\x1b[33mWARN\x1b[0m",
                Self::Error => "\x1b[91mERROR\x1b[0m",
                Self::Critical => "\x1b[31mCRITICAL\x1b[0m",
            })
        } else {
            f.write_str(match self {
                Self::Debug => "DEBUG",
                Self::Info => "INFO",
                Self::Warn => "WARN",
                Self::Error => "ERROR",
                Self::Critical => "CRITICAL",
            })
        }
    }
}

/// Destination for formatted log lines.
///
/// Implementors serialize access themselves: the logger only holds a shared
/// reference, so nested log calls must not deadlock on the writer.
pub trait LogWriter: Sync {
    fn write_line(&self, args: fmt::Arguments) -> fmt::Result;
}

pub struct Logger {
    level: LogLevel,
    sink: Once<&'static dyn LogWriter>,
}

impl Logger {
    pub const fn new(level: LogLevel) -> Self {
        Self {
            level,
            sink: Once::new(),
        }
    }

    /// Attaches the output sink. Only the first call has an effect.
    pub fn attach(&self, writer: &'static dyn LogWriter) {
        self.sink.call_once(|| writer);
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.log_args(level, format_args!("{}", message));
    }

    pub fn log_args(&self, level: LogLevel, message: fmt::Arguments) {
        if level < self.level {
            return;
        }

        if let Some(writer) = self.sink.get() {
            let _ = writer.write_line(format_args!("[{:#}]: {}", level, message));
        }
    }

    pub fn debug_args(&self, message: fmt::Arguments) {
        self.log_args(LogLevel::Debug, message);
    }

    pub fn info_args(&self, message: fmt::Arguments) {
        self.log_args(LogLevel::Info, message);
    }

    pub fn warn_args(&self, message: fmt::Arguments) {
        self.log_args(LogLevel::Warn, message);
    }

    pub fn error_args(&self, message: fmt::Arguments) {
        self.log_args(LogLevel::Error, message);
    }

    pub fn critical_args(&self, message: fmt::Arguments) {
        self.log_args(LogLevel::Critical, message);
    }
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        $crate::LOGGER.debug_args(format_args!($($arg)*));
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        $crate::LOGGER.info_args(format_args!($($arg)*));
    }};
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        $crate::LOGGER.warn_args(format_args!($($arg)*));
    }};
}

macro_rules! critical {
    ($($arg:tt)*) => {{
        $crate::LOGGER.critical_args(format_args!($($arg)*));
    }};
}

pub(crate) use debug;
pub(crate) use info;
pub(crate) use warning;
pub(crate) use critical;

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::vec::Vec;

    #[derive(Default)]
    struct Capture(spin::Mutex<Vec<String>>);

    impl LogWriter for Capture {
        fn write_line(&self, args: fmt::Arguments) -> fmt::Result {
            self.0.lock().push(std::format!("{}", args));
            Ok(())
        }
    }

    fn capture() -> &'static Capture {
        std::boxed::Box::leak(std::boxed::Box::new(Capture::default()))
    }

    #[test]
    fn drops_messages_below_level() {
        let logger = Logger::new(LogLevel::Warn);
        let sink = capture();
        logger.attach(sink);

        logger.debug_args(format_args!("noise"));
        logger.info_args(format_args!("noise"));
        logger.warn_args(format_args!("kept {}", 1));
        logger.error_args(format_args!("kept {}", 2));
        logger.critical_args(format_args!("kept {}", 3));

        let lines = sink.0.lock();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("]: kept 1"));
        assert!(lines[0].contains("WARN"));
        assert!(lines[1].contains("ERROR"));
        assert!(lines[2].contains("CRITICAL"));
    }

    #[test]
    fn silent_without_sink() {
        let logger = Logger::new(LogLevel::Debug);
        logger.log(LogLevel::Error, "nobody is listening");
        assert!(logger.sink.get().is_none());
    }

    #[test]
    fn first_attached_sink_wins() {
        let logger = Logger::new(LogLevel::Debug);
        let first = capture();
        let second = capture();
        logger.attach(first);
        logger.attach(second);

        logger.log(LogLevel::Info, "hello");

        assert_eq!(first.0.lock().len(), 1);
        assert!(second.0.lock().is_empty());
    }

    #[test]
    fn level_names() {
        assert_eq!(std::format!("{}", LogLevel::Warn), "WARN");
        assert_eq!(std::format!("{:#}", LogLevel::Error), "\x1b[91mERROR\x1b[0m");
    }
}
