//! Operator settings, read from flags or the environment

use std::time::Duration;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Fleet sync operator", long_about = None)]
pub struct OperatorConfig {
    /// Port for the metrics and health server
    #[arg(long, env = "METRICS_PORT", default_value_t = 8080)]
    pub metrics_port: u16,

    /// Maximum concurrent reconciles per controller (0 = unbounded)
    #[arg(long, env = "RECONCILE_CONCURRENCY", default_value_t = 0)]
    pub concurrency: u16,

    /// Deadline for a single reconcile, in seconds
    #[arg(long = "reconcile-timeout", env = "RECONCILE_TIMEOUT_SECS", default_value_t = 60)]
    pub reconcile_timeout_secs: u64,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value_t = true, action = ArgAction::Set)]
    pub log_json: bool,
}

impl OperatorConfig {
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OperatorConfig::try_parse_from(["fleet-sync-operator"]).unwrap();
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(60));
        assert!(config.log_json);
    }

    #[test]
    fn flags_override_defaults() {
        let config = OperatorConfig::try_parse_from([
            "fleet-sync-operator",
            "--metrics-port",
            "9090",
            "--concurrency=4",
            "--reconcile-timeout",
            "0",
            "--log-json=false",
        ])
        .unwrap();
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(1));
        assert!(!config.log_json);
    }
}
