use std::time::Duration;
use tracing::warn;

/// Process configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// How often the deferred trade processor wakes up
    pub trade_processing_interval: Duration,
    /// Restrict running-rank accumulation to completed matches
    pub running_rank_completed_only: bool,
    pub event_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            trade_processing_interval: Duration::from_secs(60),
            running_rank_completed_only: false,
            event_channel_capacity: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let event_channel_capacity = parse_or(
            &lookup,
            "EVENT_CHANNEL_CAPACITY",
            defaults.event_channel_capacity,
        );

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            trade_processing_interval: Duration::from_secs(parse_or(
                &lookup,
                "TRADE_PROCESSING_INTERVAL_SECS",
                defaults.trade_processing_interval.as_secs(),
            )),
            running_rank_completed_only: parse_or(
                &lookup,
                "RUNNING_RANK_COMPLETED_ONLY",
                defaults.running_rank_completed_only,
            ),
            event_channel_capacity: if event_channel_capacity > 0 {
                event_channel_capacity
            } else {
                defaults.event_channel_capacity
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]);
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.trade_processing_interval, Duration::from_secs(60));
        assert!(!config.running_rank_completed_only);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/fantasy"),
            ("TRADE_PROCESSING_INTERVAL_SECS", "15"),
            ("RUNNING_RANK_COMPLETED_ONLY", "true"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/fantasy")
        );
        assert_eq!(config.trade_processing_interval, Duration::from_secs(15));
        assert!(config.running_rank_completed_only);
    }

    #[test]
    fn falls_back_on_garbage() {
        let config = config_from(&[
            ("TRADE_PROCESSING_INTERVAL_SECS", "soon"),
            ("EVENT_CHANNEL_CAPACITY", "0"),
        ]);
        assert_eq!(config.trade_processing_interval, Duration::from_secs(60));
        assert_eq!(config.event_channel_capacity, 100);
    }
}
