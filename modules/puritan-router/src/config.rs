use std::time::Duration;

use tracing::info;

use crate::error::{RouterError, RouterResult};

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Delay per `TokioScheduler` tick. Zero means yield to the runtime only.
    pub tick_interval: Duration,
    /// Default tracing directive, added on top of `RUST_LOG`.
    pub log_directive: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::ZERO,
            log_directive: "puritan=info".to_string(),
        }
    }
}

impl RouterConfig {
    /// Load from the environment (and `.env`, if present).
    ///
    /// Env vars:
    /// - `PURITAN_TICK_MS`: scheduler tick interval in milliseconds (default 0)
    /// - `PURITAN_LOG`: default tracing directive (default `puritan=info`)
    pub fn from_env() -> RouterResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RouterResult<Self> {
        let defaults = Self::default();

        let tick_interval = match lookup("PURITAN_TICK_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    RouterError::Config(format!("PURITAN_TICK_MS must be a number, got {raw:?}"))
                })?;
                Duration::from_millis(ms)
            }
            None => defaults.tick_interval,
        };

        let log_directive = lookup("PURITAN_LOG")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_directive);

        Ok(Self {
            tick_interval,
            log_directive,
        })
    }

    pub fn log_summary(&self) {
        info!(
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            log = %self.log_directive,
            "Router config loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RouterConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.tick_interval, Duration::ZERO);
        assert_eq!(config.log_directive, "puritan=info");
    }

    #[test]
    fn reads_tick_and_log_directive() {
        let config = RouterConfig::from_lookup(lookup_from(&[
            ("PURITAN_TICK_MS", " 16 "),
            ("PURITAN_LOG", "puritan=debug"),
        ]))
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(16));
        assert_eq!(config.log_directive, "puritan=debug");
    }

    #[test]
    fn blank_log_directive_falls_back_to_default() {
        let config = RouterConfig::from_lookup(lookup_from(&[("PURITAN_LOG", "  ")])).unwrap();
        assert_eq!(config.log_directive, "puritan=info");
    }

    #[test]
    fn log_summary_handles_huge_tick_intervals() {
        let config = RouterConfig {
            tick_interval: Duration::MAX,
            ..RouterConfig::default()
        };
        config.log_summary();
    }

    #[test]
    fn non_numeric_tick_is_a_config_error() {
        let err = RouterConfig::from_lookup(lookup_from(&[("PURITAN_TICK_MS", "soon")])).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }
}
