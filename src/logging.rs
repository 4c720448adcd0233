use log::LevelFilter;

/// Environment variable that overrides the level chosen on the command line,
/// using `env_logger` filter syntax (e.g. `debug` or `space_cleanser::scanner=trace`).
pub const LOG_ENV: &str = "SPACE_CLEANSER_LOG";

/// Map `-v` occurrences and `--quiet` to a default level
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the logger. Logs go to stderr so they never mix with the
/// spinner or JSON written to stdout.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logger(verbosity: u8, quiet: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(verbosity, quiet))
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr);

    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }

    if builder.try_init().is_ok() {
        log::debug!("logging initialized at {}", level_for(verbosity, quiet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0, false), LevelFilter::Warn);
        assert_eq!(level_for(1, false), LevelFilter::Info);
        assert_eq!(level_for(2, false), LevelFilter::Debug);
        assert_eq!(level_for(5, false), LevelFilter::Trace);
        assert_eq!(level_for(3, true), LevelFilter::Error);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(0, true);
        init_logger(2, false);
    }
}
