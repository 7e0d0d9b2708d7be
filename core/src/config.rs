//! Connection settings for a Gophish server.

/// Server location, credentials and transport toggles.
///
/// Build one up front and hand it to [`Client::new`](crate::Client::new):
///
/// ```
/// use gophish::Config;
///
/// let config = Config::configure(|c| {
///     c.url = "https://localhost:3333".to_string();
///     c.api_key = "secret".to_string();
///     c.verify_ssl = false;
/// });
/// assert!(!config.verify_ssl);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the admin server, without the `/api` prefix.
    pub url: String,
    /// Sent verbatim in the `Authorization` header.
    pub api_key: String,
    pub verify_ssl: bool,
    /// Log every request and response at `debug` level.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            verify_ssl: true,
            debug: false,
        }
    }
}

impl Config {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Start from the defaults and let `block` fill in the settings.
    pub fn configure(block: impl FnOnce(&mut Config)) -> Self {
        let mut config = Self::default();
        block(&mut config);
        config
    }

    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
