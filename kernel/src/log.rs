//! Simple bootstrap logger
//!
//! Wires the `log` crate's facade macros (`log::info!`, `log::debug!`, ...
//! used throughout this workspace) to a single global sink function the
//! platform layer installs during early boot. Before `init_logger` runs,
//! every log record is silently dropped rather than panicking, since the
//! earliest boot code runs before any output device is available.

use core::sync::atomic::{AtomicUsize, Ordering};

use log::{Level, LevelFilter, Metadata, Record};

/// Severity threshold, mirrors `log::LevelFilter` with a concrete,
/// `Copy` representation convenient for storing in a static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// A single function pointer the platform layer installs to emit a
/// formatted line somewhere real (serial port, framebuffer console, a
/// ring buffer drained by a debugger). `None` means early boot: drop it.
static SINK: AtomicUsize = AtomicUsize::new(0);

type SinkFn = fn(&str);

/// Install the sink used to emit formatted log lines, and raise the log
/// crate's global max level so records actually reach [`KernelLogger`].
pub fn init_logger(level: LogLevel) {
    log::set_max_level(level.to_filter());
    let _ = log::set_logger(&KernelLogger);
}

/// Point log output at `sink`. Safe to call more than once (e.g. to
/// switch from a boot-time serial sink to a later console sink).
pub fn set_sink(sink: SinkFn) {
    SINK.store(sink as usize, Ordering::Release);
}

struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        let ptr = SINK.load(Ordering::Acquire);
        if ptr == 0 {
            return;
        }
        // SAFETY: only ever stored from `set_sink` as a valid `SinkFn`.
        let sink: SinkFn = unsafe { core::mem::transmute(ptr) };
        let mut line: alloc::string::String = alloc::string::String::new();
        let _ = core::fmt::write(
            &mut line,
            format_args!("[{}] {}: {}", record.level(), record.target(), record.args()),
        );
        sink(&line);
    }

    fn flush(&self) {}
}
