use crate::protocol::{CONNECT_RETRY_DELAY, POLL_INTERVAL, SECONDS_TO_FIND_HOSTS};
use crate::types::{CoordinateSystem, SessionType, Side};
use std::time::Duration;

/// What the client does when loading the hand skeleton fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupFailurePolicy {
    /// Log the failure and start streaming anyway.
    #[default]
    Ignore,
    /// Return the error from `setup_skeletons`.
    Abort,
    /// Try again, up to `attempts` loads in total, then return the last error.
    Retry { attempts: u32 },
}

impl SetupFailurePolicy {
    /// Parse `ignore`, `abort`, `retry` (3 attempts) or `retry:N`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "ignore" => Some(SetupFailurePolicy::Ignore),
            "abort" => Some(SetupFailurePolicy::Abort),
            "retry" => Some(SetupFailurePolicy::Retry { attempts: 3 }),
            other => other
                .strip_prefix("retry:")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|&n| n > 0)
                .map(|attempts| SetupFailurePolicy::Retry { attempts }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session_type: SessionType,
    pub coordinate_system: CoordinateSystem,
    /// Stream node transforms in world space instead of relative to the parent.
    pub world_space: bool,
    pub host_search_seconds: u32,
    pub loopback_only: bool,
    pub connect_retry_delay: Duration,
    pub poll_interval: Duration,
    pub setup_failure_policy: SetupFailurePolicy,
    pub install_signal_handlers: bool,
    /// User whose glove data drives the hand skeleton.
    pub user_index: u32,
    pub hand_side: Side,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_type: SessionType::CoreSdk,
            coordinate_system: CoordinateSystem::unreal(),
            world_space: false,
            host_search_seconds: SECONDS_TO_FIND_HOSTS,
            loopback_only: false,
            connect_retry_delay: CONNECT_RETRY_DELAY,
            poll_interval: POLL_INTERVAL,
            setup_failure_policy: SetupFailurePolicy::Ignore,
            install_signal_handlers: true,
            user_index: 0,
            hand_side: Side::Left,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CORESDK_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let policy = read_env_string("CORESDK_SETUP_FAILURE_POLICY", "");
        let setup_failure_policy = if policy.is_empty() {
            defaults.setup_failure_policy
        } else {
            SetupFailurePolicy::parse(&policy).unwrap_or_else(|| {
                log::warn!("unknown CORESDK_SETUP_FAILURE_POLICY {:?}, using default", policy);
                defaults.setup_failure_policy
            })
        };
        let hand_side = match read_env_string("CORESDK_HAND_SIDE", "left").as_str() {
            "right" => Side::Right,
            _ => Side::Left,
        };

        Self {
            host_search_seconds: read_env_u32(
                "CORESDK_HOST_SEARCH_SECONDS",
                defaults.host_search_seconds,
            ),
            loopback_only: read_env_bool("CORESDK_LOOPBACK_ONLY", defaults.loopback_only),
            connect_retry_delay: Duration::from_millis(read_env_u64(
                "CORESDK_RETRY_DELAY_MS",
                defaults.connect_retry_delay.as_millis() as u64,
            )),
            poll_interval: Duration::from_millis(read_env_u64(
                "CORESDK_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            setup_failure_policy,
            install_signal_handlers: read_env_bool(
                "CORESDK_SIGNAL_HANDLERS",
                defaults.install_signal_handlers,
            ),
            user_index: read_env_u32("CORESDK_USER_INDEX", defaults.user_index),
            hand_side,
            ..defaults
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_minimal_client() {
        let config = ClientConfig::default();
        assert_eq!(config.session_type, SessionType::CoreSdk);
        assert_eq!(config.connect_retry_delay, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_millis(33));
        assert_eq!(config.host_search_seconds, 1);
        assert!(!config.world_space);
        assert_eq!(config.setup_failure_policy, SetupFailurePolicy::Ignore);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(SetupFailurePolicy::parse("Abort"), Some(SetupFailurePolicy::Abort));
        assert_eq!(
            SetupFailurePolicy::parse("retry"),
            Some(SetupFailurePolicy::Retry { attempts: 3 })
        );
        assert_eq!(
            SetupFailurePolicy::parse(" retry:5 "),
            Some(SetupFailurePolicy::Retry { attempts: 5 })
        );
        assert_eq!(SetupFailurePolicy::parse("retry:0"), None);
        assert_eq!(SetupFailurePolicy::parse("sometimes"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_env_overrides() {
        // Variable names unique to this test; nothing else reads them.
        std::env::set_var("CORESDK_TEST_CONFIG_U32", "42");
        std::env::set_var("CORESDK_TEST_CONFIG_BOOL", "yes");
        assert_eq!(read_env_u32("CORESDK_TEST_CONFIG_U32", 1), 42);
        assert!(read_env_bool("CORESDK_TEST_CONFIG_BOOL", false));
        assert_eq!(read_env_u64("CORESDK_TEST_CONFIG_MISSING", 9), 9);
        assert_eq!(read_env_string("CORESDK_TEST_CONFIG_MISSING", "left"), "left");
    }
}
