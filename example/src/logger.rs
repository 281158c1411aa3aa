use std::time::Instant;

use log::{info, LevelFilter};

/// Install the process-wide logger, writing to stdout.
///
/// Debug and trace records include their target so scheduler decisions can
/// be told apart from robot code. Must only be called once.
pub fn init(min_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let epoch = Instant::now();

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let elapsed = epoch.elapsed().as_secs_f64();
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:9.3} {}] {}: {}",
                    elapsed,
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:9.3} {}] {}",
                    elapsed,
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level)
        .chain(std::io::stdout())
        .apply()?;

    info!("Logging initialised at {:?}", min_level);
    Ok(())
}

fn level_to_str(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}
