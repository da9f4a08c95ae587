use crate::configuration::Configuration;
use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

fn parse_timezone(raw: &str) -> Result<Tz, String> {
    raw.parse::<Tz>()
        .map_err(|_| format!("unknown timezone `{raw}`"))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "slot_admin", about = "Admin service for bookable session slots")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "SLOT_ADMIN_PORT", default_value = "3000")]
    port: String,

    #[arg(long, env = "SLOT_ADMIN_TIMEZONE", default_value = "Asia/Kolkata", value_parser = parse_timezone)]
    timezone: Tz,

    /// Seconds between table refreshes
    #[arg(long, env = "SLOT_ADMIN_POLL_INTERVAL", default_value_t = 60)]
    poll_interval_secs: u64,

    /// Seed example sessions and slots on startup
    #[arg(long, env = "SLOT_ADMIN_EXAMPLE_DATA")]
    example_data: bool,

    #[arg(long, env = "SLOT_ADMIN_SESSIONS_FILE")]
    sessions_file: Option<PathBuf>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> String {
        self.port.clone()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }

    fn poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs
    }

    fn example_data(&self) -> bool {
        self.example_data
    }

    fn sessions_file(&self) -> Option<PathBuf> {
        self.sessions_file.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let configuration = ConfigurationHandler::try_parse_from(["slot_admin"]).unwrap();
        assert_eq!(configuration.port(), "3000");
        assert_eq!(configuration.timezone(), chrono_tz::Asia::Kolkata);
        assert_eq!(configuration.poll_interval_secs(), 60);
        assert!(!configuration.example_data());
        assert_eq!(configuration.sessions_file(), None);
    }

    #[test]
    fn test_arguments_override_defaults() {
        let configuration = ConfigurationHandler::try_parse_from([
            "slot_admin",
            "--port",
            "8080",
            "--timezone",
            "Europe/Berlin",
            "--poll-interval-secs",
            "30",
            "--example-data",
        ])
        .unwrap();
        assert_eq!(configuration.port(), "8080");
        assert_eq!(configuration.timezone(), chrono_tz::Europe::Berlin);
        assert_eq!(configuration.poll_interval_secs(), 30);
        assert!(configuration.example_data());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        assert!(ConfigurationHandler::try_parse_from(["slot_admin", "--timezone", "Mars/Olympus"]).is_err());
    }
}
