#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::Client;
use state::InitCell;

use crate::{i18n::Locale, listing::ListingOptions, transport::HttpTransport};

/// Backend used when `DODONA_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://dodona.be";

/// Runtime configuration shared across the crate.
pub struct ConfigState {
    /// Backend root.
    base_url:     String,
    /// Token sent as `X-CSRF-Token`, if any.
    csrf_token:   Option<String>,
    /// Language of generated strings.
    locale:       Locale,
    /// Whether the course runs beta features.
    course_beta:  bool,
    /// Timeout applied to every backend call.
    http_timeout: Duration,
    /// Shared reqwest HTTP client reused by every transport.
    http_client:  Client,
    /// Lazily constructed backend transport.
    transport:    InitCell<HttpTransport>,
}

impl ConfigState {
    /// Construct a new configuration instance from the process environment.
    fn new() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construct a configuration instance reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let base_url = read("DODONA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("DODONA_BASE_URL must be an http(s) url, got `{base_url}`");
        }

        let locale = read("DODONA_LOCALE")
            .map(|code| Locale::parse(&code))
            .unwrap_or_default();
        let course_beta = read("DODONA_COURSE_BETA").is_some_and(|value| {
            matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        });
        let http_timeout = read_timeout_secs(read("DODONA_HTTP_TIMEOUT_SECS"), 30);

        let http_client = Client::builder()
            // Avoid macOS dynamic store lookups that fail in sandboxed environments.
            .no_proxy()
            .timeout(http_timeout)
            .build()
            .context("Failed to construct shared HTTP client")?;

        Ok(Self {
            base_url,
            csrf_token: read("DODONA_CSRF_TOKEN"),
            locale,
            course_beta,
            http_timeout,
            http_client,
            transport: InitCell::new(),
        })
    }

    /// Returns the backend root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the CSRF token, if configured.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Returns the configured locale.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Returns whether beta features are enabled.
    pub fn course_beta(&self) -> bool {
        self.course_beta
    }

    /// Returns the backend call timeout.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Returns the backend transport, building it on first use.
    pub fn transport(&self) -> HttpTransport {
        if let Some(transport) = self.transport.try_get() {
            return transport.clone();
        }

        self.transport.set(HttpTransport::new(
            self.http_client.clone(),
            self.base_url.clone(),
            self.csrf_token.clone(),
        ));
        self.transport.get().clone()
    }

    /// Listing options matching this configuration.
    pub fn listing_options(&self, evaluation_id: Option<u64>) -> ListingOptions {
        ListingOptions::builder()
            .locale(self.locale)
            .beta(self.course_beta())
            .evaluation_id(evaluation_id)
            .build()
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Ensure the global configuration has been initialized and return a handle.
pub fn ensure_initialized() -> Result<ConfigHandle> {
    let slot = slot();
    let mut guard = slot.lock().expect("config slot poisoned");
    if let Some(cfg) = guard.as_ref() {
        return Ok(ConfigHandle(Arc::clone(cfg)));
    }

    let cfg = Arc::new(ConfigState::new()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

/// Parses a number of seconds into a `Duration`, falling back to
/// `default_secs` when parsing fails or the value is missing.
fn read_timeout_secs(value: Option<String>, default_secs: u64) -> Duration {
    value
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
