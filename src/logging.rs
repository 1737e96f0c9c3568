use std::env;
use std::str::FromStr;

use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

pub const LOG_ENV: &str = "TSH_LOG";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

pub fn level_from(value: Option<&str>) -> LevelFilter {
	value.and_then(|v| LevelFilter::from_str(v.trim()).ok()).unwrap_or(DEFAULT_LEVEL)
}

/// Sends log records to stderr so they never mix with pipeline output.
pub fn init() {
	let level = level_from(env::var(LOG_ENV).ok().as_deref());
	let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
	let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}
