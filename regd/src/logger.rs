//! Logging setup. The original driver logged through `printk`; the daemon's user-facing
//! equivalent is a rotating file under the configured log directory plus a stderr mirror,
//! both carrying the same line format: timestamp, level, source location, thread, message.
//!
//! The teacher's own `logger.rs` is built on `flexi_logger`, but that crate never makes it
//! into the teacher's `Cargo.toml` — only `fern` does — so this reimplementation keeps the
//! teacher's declared dependency rather than its (uncompilable) source file.

use std::path::Path;

use fern::Dispatch;
use log::LevelFilter;

pub fn init(log_dir: &Path, level: LevelFilter) -> Result<(), fern::InitError> {
    std::fs::create_dir_all(log_dir).map_err(|e| fern::InitError::Io(e))?;
    let log_file = log_dir.join("regd.log");

    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{:<5}] [{}:{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                std::thread::current().name().unwrap_or("<unnamed>"),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .chain(fern::log_file(log_file)?)
        .apply()
        .map_err(fern::InitError::SetLoggerError)?;
    Ok(())
}
