use chrono_tz::Tz;
use pricelens::api::builder::{DEFAULT_DATASET_PATH, DEFAULT_PIPELINE_PATH, DEFAULT_VOCABULARY_PATH};
use pricelens::services::DEFAULT_MARKET_DATA_URL;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_MARKET_TIMEZONE: &str = "America/New_York";

// Per-client request limits for the HTTP service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst_size: 20,
        }
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub vocabulary_path: Option<String>,
    pub dataset_path: Option<String>,
    pub pipeline_path: Option<String>,
    pub auto_build_vocabulary: Option<bool>,
    pub market_data_url: Option<String>,
    pub market_data_rate_limit: Option<u32>,
    pub market_timezone: Option<String>,
    pub rate_limit: Option<RateLimitConfig>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub vocabulary_path: PathBuf,
    pub dataset_path: PathBuf,
    pub pipeline_path: PathBuf,
    pub auto_build_vocabulary: bool,
    pub market_data_url: String,
    pub market_data_rate_limit: u32,
    pub market_timezone: Tz,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Self {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> Self {
        let yaml_content = fs::read_to_string(file_path)
            .unwrap_or_else(|e| panic!("Failed to read config file {}: {}", file_path, e));

        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Self {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)
            .unwrap_or_else(|e| panic!("Failed to parse YAML config: {}", e));

        Self {
            node_name: yaml_config.node_name,
            environment: yaml_config.environment,
            port: yaml_config.port,
            vocabulary_path: yaml_config.vocabulary_path.unwrap_or_else(|| DEFAULT_VOCABULARY_PATH.to_string()).into(),
            dataset_path: yaml_config.dataset_path.unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string()).into(),
            pipeline_path: yaml_config.pipeline_path.unwrap_or_else(|| DEFAULT_PIPELINE_PATH.to_string()).into(),
            auto_build_vocabulary: yaml_config.auto_build_vocabulary.unwrap_or(true),
            market_data_url: yaml_config.market_data_url.unwrap_or_else(|| DEFAULT_MARKET_DATA_URL.to_string()),
            market_data_rate_limit: yaml_config.market_data_rate_limit.unwrap_or(30),
            market_timezone: parse_timezone(yaml_config.market_timezone.as_deref().unwrap_or(DEFAULT_MARKET_TIMEZONE)),
            rate_limit: yaml_config.rate_limit.unwrap_or_default(),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = RateLimitConfig::default();

        Self {
            node_name: lookup("NODE_NAME").unwrap_or_else(|| "pricelens-web".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            port: parsed(&lookup, "PORT").unwrap_or(8888),
            vocabulary_path: lookup("VOCABULARY_PATH").unwrap_or_else(|| DEFAULT_VOCABULARY_PATH.to_string()).into(),
            dataset_path: lookup("DATASET_PATH").unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string()).into(),
            pipeline_path: lookup("PIPELINE_PATH").unwrap_or_else(|| DEFAULT_PIPELINE_PATH.to_string()).into(),
            auto_build_vocabulary: parsed(&lookup, "AUTO_BUILD_VOCABULARY").unwrap_or(true),
            market_data_url: lookup("MARKET_DATA_URL").unwrap_or_else(|| DEFAULT_MARKET_DATA_URL.to_string()),
            market_data_rate_limit: parsed(&lookup, "MARKET_DATA_RATE_LIMIT").unwrap_or(30), // requests per minute
            market_timezone: parse_timezone(&lookup("MARKET_TIMEZONE").unwrap_or_else(|| DEFAULT_MARKET_TIMEZONE.to_string())),
            rate_limit: RateLimitConfig {
                per_second: parsed(&lookup, "RATE_LIMIT_PER_SECOND").unwrap_or(defaults.per_second),
                burst_size: parsed(&lookup, "RATE_LIMIT_BURST").unwrap_or(defaults.burst_size),
            },
        }
    }
}

// Unset or unparsable values fall back to the caller's default
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.parse().ok())
}

fn parse_timezone(name: &str) -> Tz {
    name.parse()
        .unwrap_or_else(|e| panic!("Invalid market timezone {}: {}", name, e))
}
