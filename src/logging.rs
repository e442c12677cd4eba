use colored::Colorize;
use fern::colors::{Color, ColoredLevelConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum LogLevel {
    ERROR,
    WARN,
    #[default]
    INFO,
    DEBUG,
    TRACE,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::ERROR => log::LevelFilter::Error,
            LogLevel::WARN => log::LevelFilter::Warn,
            LogLevel::INFO => log::LevelFilter::Info,
            LogLevel::DEBUG => log::LevelFilter::Debug,
            LogLevel::TRACE => log::LevelFilter::Trace,
        }
    }
}

/// Logs high-frequency overlay chatter only when verbose logging is on.
#[macro_export]
macro_rules! log_verbose {
    ($config:expr, $($arg:tt)*) => {
        if $config.verbose_logging {
            log::info!("[VERBOSE] {}", format!($($arg)*));
        }
    };
}

pub fn setup_logging(level: LogLevel) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for("simulive", level.into())
        .chain(std::io::stdout())
        .apply()
}
