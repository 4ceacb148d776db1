use std::env;
use std::path::{Path, PathBuf};

/// Parsing dialect, selected per the attached register generation.
///
/// The 420 prints line-delimited receipts with a date/time header; the 520
/// is polled and emits escape-delimited segments with no per-event clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    D420,
    D520,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::D420 => "420",
            Dialect::D520 => "520",
        }
    }

    /// Line settings are fixed per generation: 8N1, no flow control.
    pub fn baud_rate(&self) -> u32 {
        match self {
            Dialect::D420 => 9_600,
            Dialect::D520 => 115_200,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub dialect: Dialect,
    pub serial_port: String,
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub quiet_seconds: i64,
    pub single_item_cap: f64,
    pub currency_symbol: char,
    pub monitor_mode: bool,
    pub logging_enabled: bool,
    pub plu_catalog_path: PathBuf,
    pub shops_csv_path: PathBuf,
    pub output_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub capture_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let dialect = match env::var("ECR_DIALECT").ok().as_deref() {
            Some("420") => Dialect::D420,
            Some("520") => Dialect::D520,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "ECR_DIALECT must be 420 or 520, got '{}'",
                    other
                )))
            }
            // Marker file convention carried over from site installs.
            None if Path::new("config/520").exists() => Dialect::D520,
            None => Dialect::D420,
        };

        let serial_port =
            env::var("SERIAL_PORT").unwrap_or_else(|_| "/dev/ttyS0".to_string());

        let opening_hour = parse_env_u32("OPENING_HOUR", 6)?;
        let closing_hour = parse_env_u32("CLOSING_HOUR", 23)?;
        if opening_hour > 23 || closing_hour > 23 {
            return Err(ConfigError::InvalidValue(
                "OPENING_HOUR and CLOSING_HOUR must be 0-23".to_string(),
            ));
        }
        if opening_hour >= closing_hour {
            return Err(ConfigError::InvalidValue(format!(
                "OPENING_HOUR ({}) must precede CLOSING_HOUR ({})",
                opening_hour, closing_hour
            )));
        }

        let quiet_seconds = env::var("QUIET_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1200);

        let single_item_cap = env::var("SINGLE_ITEM_CAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200.0);

        let currency_symbol = env::var("CURRENCY_SYMBOL")
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('£');

        let monitor_mode = env_flag("MONITOR_MODE");
        let logging_enabled = env_flag("LOGGING_ENABLED");

        Ok(Self {
            dialect,
            serial_port,
            opening_hour,
            closing_hour,
            quiet_seconds,
            single_item_cap,
            currency_symbol,
            monitor_mode,
            logging_enabled,
            plu_catalog_path: env_path("PLU_CATALOG_PATH", "plu.txt"),
            shops_csv_path: env_path("SHOPS_CSV_PATH", "shops.csv"),
            output_dir: env_path("OUTPUT_DIR", "ecr_data"),
            checkpoint_dir: env_path("CHECKPOINT_DIR", "."),
            capture_path: env_path("CAPTURE_PATH", "capture.log"),
        })
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be an integer, got '{}'", name, raw))
        }),
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| {
            let v = v.to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    env::var(name).unwrap_or_else(|_| default.to_string()).into()
}
