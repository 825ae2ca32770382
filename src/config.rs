use crate::entity::Window;
use crate::error::{CoreError, Result};
use crate::palette::Palette;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_base: String,
    pub window_start: usize,
    pub window_end: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_retries: u32,
    pub retry_base_ms: u64,
    pub palette: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_base: "https://restcountries.com/v2".to_string(),
            window_start: 0,
            window_end: 9,
            fetch_timeout_secs: 10,
            fetch_retries: 3,
            retry_base_ms: 200,
            palette: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            source_base: std::env::var("SOURCE_BASE").unwrap_or(d.source_base),
            window_start: env_parse("WINDOW_START").unwrap_or(d.window_start),
            window_end: env_parse("WINDOW_END").unwrap_or(d.window_end),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS").unwrap_or(d.fetch_timeout_secs),
            fetch_retries: env_parse("FETCH_RETRIES").unwrap_or(d.fetch_retries),
            retry_base_ms: env_parse("RETRY_BASE_MS").unwrap_or(d.retry_base_ms),
            palette: std::env::var("PALETTE").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn window(&self) -> Result<Window> {
        Window::new(self.window_start, self.window_end)
    }

    pub fn palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(list) => Palette::parse_list(list),
            None => Ok(Palette::default()),
        }
    }

    /// Checks everything that must fail at setup rather than per call.
    pub fn validate(&self) -> Result<()> {
        self.window()?;
        self.palette()?;
        url::Url::parse(&self.source_base).map_err(|e| CoreError::InvalidConfig {
            details: format!("source base {:?}: {}", self.source_base, e),
        })?;
        Ok(())
    }
}
