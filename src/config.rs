use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use std::fmt;

use crate::constants::DEFAULT_DISPLAY_ACCURACY;
use crate::screening::ModelKind;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub max_image_bytes: usize,
    pub screening: ScreeningConfig,
    pub remote_landmarks: RemoteLandmarksConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    pub default_model: ModelKind,
    /// `None` 表示展示真实置信度，不做固定显示
    pub display_accuracy_pin: Option<u8>,
}

#[derive(Clone)]
pub struct RemoteLandmarksConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub tick_ms: u64,
    pub stream_interval_ms: u64,
    pub auto_start: bool,
    pub max_streams: usize,
}

impl fmt::Debug for RemoteLandmarksConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteLandmarksConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            stream_interval_ms: 500,
            auto_start: true,
            max_streams: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            max_image_bytes: env_or_parse("MAX_IMAGE_BYTES", 8 * 1024 * 1024_usize),
            screening: ScreeningConfig {
                default_model: env_or_parse("SCREENING_DEFAULT_MODEL", ModelKind::Enhanced),
                display_accuracy_pin: env_or_pin("DISPLAY_ACCURACY_PIN", DEFAULT_DISPLAY_ACCURACY),
            },
            remote_landmarks: RemoteLandmarksConfig {
                enabled: env_or_bool("REMOTE_LANDMARKS_ENABLED", false),
                base_url: env_or("REMOTE_LANDMARKS_URL", "http://127.0.0.1:5000"),
                api_key: env_or("REMOTE_LANDMARKS_API_KEY", ""),
                timeout_secs: env_or_parse("REMOTE_LANDMARKS_TIMEOUT_SECS", 5_u64),
            },
            monitor: MonitorConfig {
                tick_ms: env_or_parse("MONITOR_TICK_MS", 100_u64).max(1),
                stream_interval_ms: env_or_parse("MONITOR_STREAM_MS", 500_u64).max(1),
                auto_start: env_or_bool("MONITOR_AUTO_START", true),
                max_streams: env_or_parse("MONITOR_MAX_STREAMS", 50_usize),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// 百分比固定值：`off`/`none` 关闭，其余按 0..=100 解析。
fn env_or_pin(key: &str, default: u8) -> Option<u8> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => None,
            other => match other.parse::<u8>() {
                Ok(v) if v <= 100 => Some(v),
                _ => {
                    tracing::warn!(key, value = %raw, "Invalid accuracy pin, using default");
                    Some(default)
                }
            },
        },
        Err(_) => Some(default),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "SCREENING_DEFAULT_MODEL",
            "DISPLAY_ACCURACY_PIN",
            "REMOTE_LANDMARKS_ENABLED",
            "REMOTE_LANDMARKS_API_KEY",
            "REMOTE_LANDMARKS_TIMEOUT_SECS",
            "MONITOR_TICK_MS",
            "MONITOR_MAX_STREAMS",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.screening.default_model, ModelKind::Enhanced);
        assert_eq!(cfg.screening.display_accuracy_pin, Some(90));
        assert!(!cfg.remote_landmarks.enabled);
        assert_eq!(cfg.monitor.tick_ms, 100);
    }

    #[test]
    fn parses_numeric_and_model_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("SCREENING_DEFAULT_MODEL", "ML");
        env::set_var("REMOTE_LANDMARKS_TIMEOUT_SECS", "42");
        env::set_var("MONITOR_MAX_STREAMS", "3");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.screening.default_model, ModelKind::Ml);
        assert_eq!(cfg.remote_landmarks.timeout_secs, 42);
        assert_eq!(cfg.monitor.max_streams, 3);
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("SCREENING_DEFAULT_MODEL", "turbo");
        env::set_var("DISPLAY_ACCURACY_PIN", "250");
        env::set_var("MONITOR_TICK_MS", "0");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.screening.default_model, ModelKind::Enhanced);
        assert_eq!(cfg.screening.display_accuracy_pin, Some(90));
        assert_eq!(cfg.monitor.tick_ms, 1);
    }

    #[test]
    fn accuracy_pin_can_be_disabled() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("DISPLAY_ACCURACY_PIN", "off");
        assert_eq!(Config::from_env().screening.display_accuracy_pin, None);

        env::set_var("DISPLAY_ACCURACY_PIN", "75");
        assert_eq!(Config::from_env().screening.display_accuracy_pin, Some(75));
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("REMOTE_LANDMARKS_ENABLED", "yes");
        env::set_var("REMOTE_LANDMARKS_API_KEY", "super-secret-key");

        let cfg = Config::from_env();
        assert!(cfg.remote_landmarks.enabled);
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret-key"));
        assert!(dbg.contains("***REDACTED***"));
    }
}
