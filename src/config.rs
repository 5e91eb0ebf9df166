use serde::Deserialize;

pub const DEFAULT_CRM_BASE_URL: &str = "https://api.intercom.io";
pub const DEFAULT_CRM_API_VERSION: &str = "2.11";
pub const DEFAULT_LEAD_TAG: &str = "Demo Request";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Optional at startup; submissions fail with a configuration error while it is absent.
    pub crm_token: Option<String>,
    pub crm_base_url: String,
    pub crm_api_version: String,
    pub crm_lead_tag: String,
    pub crm_timeout_secs: u64,
    pub rate_limit_replenish_secs: u64,
    pub rate_limit_burst: u32,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            port: non_empty("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            crm_token: non_empty("CRM_ACCESS_TOKEN")
                .or_else(|| non_empty("INTERCOM_ACCESS_TOKEN"))
                .map(|token| token.trim().to_string()),
            crm_base_url: non_empty("CRM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CRM_BASE_URL.to_string())
                .trim()
                .trim_end_matches('/')
                .to_string(),
            crm_api_version: non_empty("CRM_API_VERSION")
                .unwrap_or_else(|| DEFAULT_CRM_API_VERSION.to_string()),
            crm_lead_tag: non_empty("CRM_LEAD_TAG").unwrap_or_else(|| DEFAULT_LEAD_TAG.to_string()),
            crm_timeout_secs: parse_or(&non_empty, "CRM_TIMEOUT_SECS", 10)?,
            rate_limit_replenish_secs: parse_or(&non_empty, "RATE_LIMIT_REPLENISH_SECS", 2)?,
            rate_limit_burst: parse_or(&non_empty, "RATE_LIMIT_BURST", 5)?,
            max_body_bytes: parse_or(&non_empty, "MAX_BODY_BYTES", 64 * 1024)?,
        };

        let parsed = url::Url::parse(&config.crm_base_url)
            .map_err(|e| anyhow::anyhow!("CRM_BASE_URL is not a valid URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("CRM_BASE_URL must start with http:// or https://");
        }
        if config.crm_timeout_secs == 0 {
            anyhow::bail!("CRM_TIMEOUT_SECS must be greater than zero");
        }
        if config.rate_limit_replenish_secs == 0 || config.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_REPLENISH_SECS and RATE_LIMIT_BURST must be greater than zero");
        }

        // Log successful configuration load (without sensitive values)
        tracing::debug!("CRM Base URL: {}", config.crm_base_url);
        tracing::debug!("CRM API version: {}", config.crm_api_version);
        tracing::debug!("CRM token configured: {}", config.crm_token.is_some());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}
