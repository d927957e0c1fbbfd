use anyhow::{anyhow, Context, Result};
use bigdecimal::BigDecimal;
use reqwest::Url;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SATIM_BASE_URL: &str = "https://test.satim.dz/payment/rest";
const DEFAULT_LANGUAGE: &str = "FR";
const DEFAULT_MIN_PRICE: &str = "50";
const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-01";
const DEFAULT_PORT: u16 = 10000;

#[derive(Clone)]
pub struct SatimCredentials {
    pub username: String,
    pub password: String,
    pub terminal_id: String,
}

impl fmt::Debug for SatimCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatimCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("terminal_id", &self.terminal_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: SatimCredentials,
    pub register_endpoint: Url,
    pub confirm_endpoint: Url,
    pub language: String,
    pub min_price: BigDecimal,
    pub return_url: String,
    pub fail_url: String,
}

#[derive(Clone)]
pub struct ShopifyConfig {
    pub api_base_url: String,
    pub api_version: String,
    pub access_token: String,
}

impl fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("access_token", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct RelayConfig {
    pub gateway: GatewayConfig,
    pub shopify: Option<ShopifyConfig>,
    pub webhook_secret: Option<String>,
    pub outbound_timeout: Duration,
    pub connect_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("gateway", &self.gateway)
            .field("shopify", &self.shopify)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .field("outbound_timeout", &self.outbound_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("allowed_origins", &self.allowed_origins)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let credentials = SatimCredentials {
            username: require("SATIM_USERNAME")?,
            password: require("SATIM_PASSWORD")?,
            terminal_id: require("SATIM_TERMINAL_ID")?,
        };

        let base_url = get("SATIM_BASE_URL").unwrap_or_else(|| DEFAULT_SATIM_BASE_URL.to_string());
        let register_endpoint = endpoint(&base_url, "register.do")?;
        let confirm_endpoint = endpoint(&base_url, "confirmOrder.do")?;

        let language = get("SATIM_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let min_price_raw = get("SATIM_MIN_PRICE").unwrap_or_else(|| DEFAULT_MIN_PRICE.to_string());
        let min_price = BigDecimal::from_str(&min_price_raw)
            .map_err(|err| anyhow!("Invalid SATIM_MIN_PRICE '{min_price_raw}': {err}"))?;

        let callback_base = require("RELAY_CALLBACK_BASE_URL")?;
        let callback_base = callback_base.trim_end_matches('/');
        Url::parse(callback_base)
            .with_context(|| format!("Invalid RELAY_CALLBACK_BASE_URL '{callback_base}'"))?;
        let return_url = format!("{callback_base}/success");
        let fail_url = format!("{callback_base}/failure");

        let shopify = match (get("SHOPIFY_STORE"), get("SHOPIFY_ACCESS_TOKEN")) {
            (Some(store), Some(access_token)) => {
                let api_base_url = get("SHOPIFY_API_BASE_URL")
                    .unwrap_or_else(|| format!("https://{store}.myshopify.com"));
                Some(ShopifyConfig {
                    api_base_url: api_base_url.trim_end_matches('/').to_string(),
                    api_version: get("SHOPIFY_API_VERSION")
                        .unwrap_or_else(|| DEFAULT_SHOPIFY_API_VERSION.to_string()),
                    access_token,
                })
            }
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "SHOPIFY_STORE and SHOPIFY_ACCESS_TOKEN must be set together"
                ))
            }
        };

        let outbound_timeout = seconds_from(&get, "OUTBOUND_TIMEOUT_SECONDS", 15)?;
        let connect_timeout = seconds_from(&get, "OUTBOUND_CONNECT_TIMEOUT_SECONDS", 5)?;

        let allowed_origins = get("RELAY_ALLOWED_ORIGINS")
            .map(|value| parse_list(&value))
            .unwrap_or_else(default_origins);

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|err| anyhow!("Invalid PORT '{value}': {err}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            gateway: GatewayConfig {
                credentials,
                register_endpoint,
                confirm_endpoint,
                language,
                min_price,
                return_url,
                fail_url,
            },
            shopify,
            webhook_secret: get("SHOPIFY_WEBHOOK_SECRET"),
            outbound_timeout,
            connect_timeout,
            allowed_origins,
            host,
            port,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: std::net::IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST '{}'", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

fn endpoint(base_url: &str, operation: &str) -> Result<Url> {
    let raw = format!("{}/{operation}", base_url.trim_end_matches('/'));
    Url::parse(&raw).with_context(|| format!("Invalid SATIM_BASE_URL '{base_url}'"))
}

fn seconds_from<G>(get: &G, key: &str, default: u64) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let secs = match get(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|err| anyhow!("Invalid {key} '{value}': {err}"))?,
        None => default,
    };
    if secs == 0 {
        return Err(anyhow!("Invalid {key} '0': timeout must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
