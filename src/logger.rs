use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};

struct InventoryLogger;

impl log::Log for InventoryLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "{} {} - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: InventoryLogger = InventoryLogger;

/// Installs the stderr logger. Can only succeed once per process.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
