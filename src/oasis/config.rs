use std::{env, time::Duration};

use jiff::tz::TimeZone;

use super::error::OasisError;

pub const DEFAULT_BASE_URL: &str = "http://oasis.caiso.com/oasisapi/SingleZip";
pub const DEFAULT_TIME_ZONE: &str = "America/Los_Angeles";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct OasisConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Time zone the caller's civil datetimes are expressed in.
    pub time_zone: TimeZone,
}

impl Default for OasisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            time_zone: TimeZone::get(DEFAULT_TIME_ZONE).unwrap_or(TimeZone::UTC),
        }
    }
}

impl OasisConfig {
    /// Read the configuration from the environment, falling back on the defaults
    /// for the variables that are not set:
    ///  - OASIS_BASE_URL
    ///  - OASIS_TIMEOUT_SECS
    ///  - OASIS_TIME_ZONE, an IANA name, e.g. America/Los_Angeles
    ///
    pub fn from_env() -> Result<OasisConfig, OasisError> {
        let mut config = OasisConfig::default();
        if let Ok(url) = env::var("OASIS_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(secs) = env::var("OASIS_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| OasisError::Config(format!("OASIS_TIMEOUT_SECS={}: {}", secs, e)))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(name) = env::var("OASIS_TIME_ZONE") {
            config.time_zone = TimeZone::get(&name)?;
        }
        Ok(config)
    }

    pub fn with_base_url<S: Into<String>>(mut self, value: S) -> Self {
        self.base_url = value.into();
        self
    }

    pub fn with_timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    pub fn with_time_zone(mut self, name: &str) -> Result<Self, OasisError> {
        self.time_zone = TimeZone::get(name)?;
        Ok(self)
    }
}
