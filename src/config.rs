use std::env;

use url::{Host, Url};

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE: &str = "https://api.deepseek.com";
const TAVILY_BASE: &str = "https://api.tavily.com";

const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYNTHESIS_MODEL: &str = "gpt-4o-mini";
const DEFAULT_REASONING_MODEL: &str = "deepseek-reasoner";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingKey(&'static str),

    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },

    #[error("{0} must use https (plain http is only accepted for loopback hosts)")]
    InsecureUrl(&'static str),
}

/// Whether credentials may be sent to `url`: https anywhere, plain http only
/// to a loopback host such as a local proxy.
pub fn is_trusted_transport(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => match url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        },
        _ => false,
    }
}

/// Secret credential. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct ModelEndpoint {
    pub base_url: Url,
    pub api_key: ApiKey,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SearchEndpoint {
    pub base_url: Url,
    pub api_key: ApiKey,
}

/// Everything read from the process environment, loaded once at startup.
///
/// Required: `OPENAI_API_KEY` (extraction and synthesis), `DEEPSEEK_API_KEY`
/// (reasoning), `TAVILY_API_KEY` (search).
/// Optional: `OPENAI_BASE_URL`, `DEEPSEEK_BASE_URL`, `TAVILY_BASE_URL`,
/// `EXTRACTION_MODEL`, `SYNTHESIS_MODEL`, `REASONING_MODEL`.
#[derive(Debug, Clone)]
pub struct Config {
    pub extraction: ModelEndpoint,
    pub reasoning: ModelEndpoint,
    pub synthesis: ModelEndpoint,
    pub search: SearchEndpoint,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let key = |var: &'static str| get(var).map(ApiKey::new).ok_or(ConfigError::MissingKey(var));
        let base_url = |var: &'static str, default: &str| -> Result<Url, ConfigError> {
            let raw = get(var).unwrap_or_else(|| default.to_string());
            let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { var, source })?;
            if !is_trusted_transport(&url) {
                return Err(ConfigError::InsecureUrl(var));
            }
            Ok(url)
        };
        let model = |var: &str, default: &str| get(var).unwrap_or_else(|| default.to_string());

        let openai_key = key("OPENAI_API_KEY")?;
        let deepseek_key = key("DEEPSEEK_API_KEY")?;
        let tavily_key = key("TAVILY_API_KEY")?;
        let openai_base = base_url("OPENAI_BASE_URL", OPENAI_BASE)?;

        Ok(Self {
            extraction: ModelEndpoint {
                base_url: openai_base.clone(),
                api_key: openai_key.clone(),
                model: model("EXTRACTION_MODEL", DEFAULT_EXTRACTION_MODEL),
            },
            reasoning: ModelEndpoint {
                base_url: base_url("DEEPSEEK_BASE_URL", DEEPSEEK_BASE)?,
                api_key: deepseek_key,
                model: model("REASONING_MODEL", DEFAULT_REASONING_MODEL),
            },
            synthesis: ModelEndpoint {
                base_url: openai_base,
                api_key: openai_key,
                model: model("SYNTHESIS_MODEL", DEFAULT_SYNTHESIS_MODEL),
            },
            search: SearchEndpoint {
                base_url: base_url("TAVILY_BASE_URL", TAVILY_BASE)?,
                api_key: tavily_key,
            },
        })
    }
}
