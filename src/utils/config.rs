use std::path::PathBuf;
use std::time::Duration;

/// Harness configuration
///
/// Defaults come from `MURWREN_*` environment variables; CLI flags are
/// applied on top by the binary.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding the page under test and its fixtures
    pub app_root: PathBuf,

    /// Where screenshots and report files are written
    pub output_dir: PathBuf,

    /// Run the browser without a window; `None` leaves it to the suite
    pub headless: Option<bool>,

    /// Overrides the asset server port a suite asks for
    pub port_override: Option<u16>,

    /// Interval between condition evaluations
    pub poll_interval: Duration,

    /// Timeout for waits that do not name their own
    pub default_timeout: Duration,

    /// Keep the browser open this long before teardown
    pub linger: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app_root: env_path("MURWREN_APP_ROOT").unwrap_or_else(|| PathBuf::from(".")),
            output_dir: env_path("MURWREN_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from(".")),
            headless: env_flag("MURWREN_HEADLESS"),
            port_override: env_parse("MURWREN_PORT"),
            poll_interval: Duration::from_millis(env_parse("MURWREN_POLL_INTERVAL_MS").unwrap_or(50)),
            default_timeout: Duration::from_millis(
                env_parse("MURWREN_DEFAULT_TIMEOUT_MS").unwrap_or(10_000),
            ),
            linger: Duration::from_millis(env_parse("MURWREN_LINGER_MS").unwrap_or(0)),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_ignores_garbage() {
        std::env::set_var("MURWREN_TEST_PARSE_GARBAGE", "not-a-number");
        assert_eq!(env_parse::<u64>("MURWREN_TEST_PARSE_GARBAGE"), None);

        std::env::set_var("MURWREN_TEST_PARSE_OK", " 8890 ");
        assert_eq!(env_parse::<u16>("MURWREN_TEST_PARSE_OK"), Some(8890));
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_defaults_are_bounded() {
        let config = HarnessConfig::default();
        assert!(config.poll_interval > Duration::ZERO);
        assert!(config.default_timeout > Duration::ZERO);
    }
}
