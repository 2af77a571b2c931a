//! Defines the configuration settings for the call-order-matcher application.

use anyhow::Context;
use clap::Args;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_RETELL_API_URL: &str = "https://api.retellai.com/v2/list-calls";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DAYS_BACK: u64 = 7;
const DEFAULT_CSV_FILE: &str = "retell_vs_shopify_matches.csv";

/// Configuration flags shared by every subcommand.
#[derive(Args, Debug, Default)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (TOML format)
    #[arg(long = "config", global = true, env = "MATCHER_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Calling-platform endpoint that lists calls
    #[arg(long, global = true, env = "RETELL_API_URL")]
    pub retell_api_url: Option<String>,

    /// Calling-platform API key (sent as a bearer token)
    #[arg(long, global = true, env = "RETELL_API_KEY", hide_env_values = true)]
    pub retell_api_key: Option<String>,

    /// Storefront orders endpoint, e.g. https://shop.myshopify.com/admin/api/2023-04/orders.json?status=any
    #[arg(long, global = true, env = "SHOPIFY_ORDERS_URL")]
    pub shopify_orders_url: Option<String>,

    /// Storefront API key (basic auth user)
    #[arg(long, global = true, env = "SHOPIFY_API_KEY", hide_env_values = true)]
    pub shopify_api_key: Option<String>,

    /// Storefront API password (basic auth password)
    #[arg(long, global = true, env = "SHOPIFY_PASSWORD", hide_env_values = true)]
    pub shopify_password: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "MATCHER_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// User agent string for HTTP requests
    #[arg(long, global = true, env = "MATCHER_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Match every fetched order, ignoring the date window for orders
    #[arg(long, global = true, env = "MATCHER_LEGACY_ORDER_WINDOW")]
    pub legacy_order_window: bool,
}

/// TOML Configuration file structure
#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    retell: Option<RetellConfig>,
    shopify: Option<ShopifyConfig>,
    network: Option<NetworkConfig>,
    matching: Option<MatchingConfig>,
    output: Option<OutputConfig>,
}

#[derive(Deserialize, Debug, Default)]
struct RetellConfig {
    api_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ShopifyConfig {
    orders_url: Option<String>,
    api_key: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct NetworkConfig {
    request_timeout: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct MatchingConfig {
    days_back: Option<u64>,
    legacy_order_window: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
struct OutputConfig {
    csv_file: Option<PathBuf>,
    json_file: Option<PathBuf>,
}

/// Application configuration settings.
#[derive(Clone)]
pub(crate) struct Config {
    /// Endpoint listing calls on the calling platform.
    pub retell_api_url: String,
    /// Bearer token for the calling platform.
    pub retell_api_key: Option<String>,
    /// Endpoint listing orders on the storefront.
    pub shopify_orders_url: Option<String>,
    pub shopify_api_key: Option<String>,
    pub shopify_password: Option<String>,
    /// Timeout for individual HTTP requests.
    pub request_timeout: Duration,
    /// User agent string to use for HTTP requests.
    pub user_agent: String,
    /// Length of the default date window ending today.
    pub days_back: u64,
    /// When set, orders outside the date window are still matched.
    pub legacy_order_window: bool,
    /// Where match results are written as CSV.
    pub csv_file: PathBuf,
    /// Where the full comparison report is written as JSON, if anywhere.
    pub json_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retell_api_url: DEFAULT_RETELL_API_URL.to_string(),
            retell_api_key: None,
            shopify_orders_url: None,
            shopify_api_key: None,
            shopify_password: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            days_back: DEFAULT_DAYS_BACK,
            legacy_order_window: false,
            csv_file: PathBuf::from(DEFAULT_CSV_FILE),
            json_file: None,
        }
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "<set>" } else { "<unset>" }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("retell_api_url", &self.retell_api_url)
            .field("retell_api_key", &redact(&self.retell_api_key))
            .field("shopify_orders_url", &self.shopify_orders_url)
            .field("shopify_api_key", &redact(&self.shopify_api_key))
            .field("shopify_password", &redact(&self.shopify_password))
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("days_back", &self.days_back)
            .field("legacy_order_window", &self.legacy_order_window)
            .field("csv_file", &self.csv_file)
            .field("json_file", &self.json_file)
            .finish()
    }
}

/// Load configuration from a TOML file
fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    if !path.exists() {
        tracing::warn!("Configuration file {} not found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", path.display()))?;

    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    if let Some(retell) = &file_config.retell {
        if let Some(url) = &retell.api_url {
            config.retell_api_url = url.clone();
        }
        if let Some(key) = &retell.api_key {
            config.retell_api_key = Some(key.clone());
        }
    }

    if let Some(shopify) = &file_config.shopify {
        if let Some(url) = &shopify.orders_url {
            config.shopify_orders_url = Some(url.clone());
        }
        if let Some(key) = &shopify.api_key {
            config.shopify_api_key = Some(key.clone());
        }
        if let Some(password) = &shopify.password {
            config.shopify_password = Some(password.clone());
        }
    }

    if let Some(network) = &file_config.network {
        if let Some(timeout) = network.request_timeout {
            config.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(user_agent) = &network.user_agent {
            config.user_agent = user_agent.clone();
        }
    }

    if let Some(matching) = &file_config.matching {
        if let Some(days) = matching.days_back {
            config.days_back = days;
        }
        if let Some(legacy) = matching.legacy_order_window {
            config.legacy_order_window = legacy;
        }
    }

    if let Some(output) = &file_config.output {
        if let Some(csv) = &output.csv_file {
            config.csv_file = csv.clone();
        }
        if let Some(json) = &output.json_file {
            config.json_file = Some(json.clone());
        }
    }
}

/// Apply command line arguments to the Config instance
fn apply_cli_args(config: &mut Config, args: &ConfigArgs) {
    if let Some(ref url) = args.retell_api_url {
        config.retell_api_url = url.clone();
    }
    if let Some(ref key) = args.retell_api_key {
        config.retell_api_key = Some(key.clone());
    }
    if let Some(ref url) = args.shopify_orders_url {
        config.shopify_orders_url = Some(url.clone());
    }
    if let Some(ref key) = args.shopify_api_key {
        config.shopify_api_key = Some(key.clone());
    }
    if let Some(ref password) = args.shopify_password {
        config.shopify_password = Some(password.clone());
    }
    if let Some(timeout) = args.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref agent) = args.user_agent {
        config.user_agent = agent.clone();
    }
    if args.legacy_order_window {
        config.legacy_order_window = true;
    }
}

fn validate_config(config: &mut Config) -> anyhow::Result<()> {
    // Blank values from env or TOML count as unset.
    for value in [
        &mut config.retell_api_key,
        &mut config.shopify_orders_url,
        &mut config.shopify_api_key,
        &mut config.shopify_password,
    ] {
        if value.as_deref().is_some_and(|s| s.trim().is_empty()) {
            *value = None;
        }
    }

    Url::parse(&config.retell_api_url)
        .with_context(|| format!("Invalid calling-platform URL: {}", config.retell_api_url))?;
    if let Some(ref url) = config.shopify_orders_url {
        Url::parse(url).with_context(|| format!("Invalid storefront orders URL: {}", url))?;
    }

    if config.request_timeout.is_zero() {
        config.request_timeout = Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS);
        tracing::warn!(
            "Request timeout was set to 0. Setting to {}s.",
            DEFAULT_REQUEST_TIMEOUT_SECS
        );
    }

    if config.days_back == 0 {
        config.days_back = 1;
        tracing::warn!("days_back was set to 0. Setting to 1.");
    }

    Ok(())
}

/// Builds the effective configuration: defaults, then the TOML file, then
/// command line and environment overrides.
pub(crate) fn build_config(args: &ConfigArgs) -> anyhow::Result<Config> {
    let mut config = Config::default();

    if let Some(ref file_path) = args.config_file {
        let file_config = load_config_file(file_path)?;
        apply_file_config(&mut config, &file_config);
    } else {
        for path in ["./call-order-matcher.toml", "./config.toml"] {
            let path = Path::new(path);
            if path.exists() {
                match load_config_file(path) {
                    Ok(file_config) => {
                        apply_file_config(&mut config, &file_config);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load configuration from {}: {:#}", path.display(), e);
                    }
                }
            }
        }
    }

    apply_cli_args(&mut config, args);

    validate_config(&mut config)?;

    tracing::debug!("Final configuration: {:?}", config);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retell_api_url, DEFAULT_RETELL_API_URL);
        assert_eq!(config.days_back, 7);
        assert!(!config.legacy_order_window);
        assert_eq!(config.csv_file, PathBuf::from(DEFAULT_CSV_FILE));
    }

    #[test]
    fn test_file_then_cli_layering() {
        let file = write_toml(
            r#"
            [retell]
            api_key = "from-file"

            [shopify]
            orders_url = "https://shop.example.com/admin/api/2023-04/orders.json?status=any"
            api_key = "shop-key"
            password = "shop-pass"

            [network]
            request_timeout = 12

            [matching]
            days_back = 14
            legacy_order_window = true

            [output]
            json_file = "report.json"
            "#,
        );
        let args = ConfigArgs {
            config_file: Some(file.path().to_path_buf()),
            retell_api_key: Some("from-cli".into()),
            request_timeout: Some(3),
            ..Default::default()
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.retell_api_key.as_deref(), Some("from-cli"));
        assert_eq!(config.shopify_api_key.as_deref(), Some("shop-key"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.days_back, 14);
        assert!(config.legacy_order_window);
        assert_eq!(config.json_file, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_validation_clamps_and_blanks() {
        let mut config = Config {
            days_back: 0,
            request_timeout: Duration::ZERO,
            retell_api_key: Some("  ".into()),
            ..Default::default()
        };
        validate_config(&mut config).unwrap();
        assert_eq!(config.days_back, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        assert_eq!(config.retell_api_key, None);
    }

    #[test]
    fn test_validation_rejects_bad_url() {
        let mut config = Config {
            shopify_orders_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(validate_config(&mut config).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_toml("[matching]\ndays_back = \"seven\"\n");
        let args = ConfigArgs {
            config_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            shopify_password: Some("hunter2".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<set>"));
    }
}
