//! Configuration for the document service and the pipeline around it.
//!
//! Everything the pipeline needs from the outside world lives in
//! [`ServiceConfig`]: the two service surfaces (generation and processing),
//! each with its own base URL and credential pair, plus timeouts, the polling
//! policy and the template location. The struct is built once at startup and
//! shared read-only by every invocation.
//!
//! Building fails with [`MemoError::Configuration`] when a credential is
//! missing, so a process without credentials never gets as far as a network
//! call.

use crate::error::MemoError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default host for both service surfaces.
pub const DEFAULT_BASE_URL: &str = "https://na1.fusion.foxit.com";

/// Default location of the memo template, relative to the working directory.
pub const DEFAULT_TEMPLATE_PATH: &str = "public/template.docx";

/// Environment variable names read by [`ServiceConfig::from_env`].
pub mod env {
    pub const DOCGEN_CLIENT_ID: &str = "FOXIT_DOCGEN_CLIENT_ID";
    pub const DOCGEN_CLIENT_SECRET: &str = "FOXIT_DOCGEN_CLIENT_SECRET";
    pub const DOCGEN_BASE_URL: &str = "FOXIT_DOCGEN_BASE_URL";
    pub const PDF_CLIENT_ID: &str = "FOXIT_PDF_CLIENT_ID";
    pub const PDF_CLIENT_SECRET: &str = "FOXIT_PDF_CLIENT_SECRET";
    pub const PDF_BASE_URL: &str = "FOXIT_PDF_BASE_URL";
    pub const TEMPLATE_PATH: &str = "MEMO_TEMPLATE_PATH";
    pub const POLL_INTERVAL_MS: &str = "MEMO_POLL_INTERVAL_MS";
    pub const POLL_MAX_ATTEMPTS: &str = "MEMO_POLL_MAX_ATTEMPTS";
    pub const HTTP_TIMEOUT_SECS: &str = "MEMO_HTTP_TIMEOUT_SECS";
    pub const OWNER_PASSWORD: &str = "MEMO_OWNER_PASSWORD";
}

/// A `client_id` / `client_secret` pair for one service surface.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Trimmed credentials; `None` when either half is blank.
    pub fn new(client_id: impl AsRef<str>, client_secret: impl AsRef<str>) -> Option<Self> {
        let client_id = client_id.as_ref().trim();
        let client_secret = client_secret.as_ref().trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// One remote surface: base URL plus the credentials it expects.
#[derive(Debug, Clone)]
pub struct Surface {
    pub base_url: String,
    pub credentials: Credentials,
}

impl Surface {
    /// Join `path` onto the base URL without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Validated configuration for the memo pipeline.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::from_env()`].
///
/// # Example
/// ```rust
/// use securememo::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .generation_credentials("gen-id", "gen-secret")
///     .processing_credentials("pdf-id", "pdf-secret")
///     .poll_interval_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_max_attempts, 15);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Document-generation surface (template → PDF).
    pub generation: Surface,

    /// PDF-services surface (upload, protect, tasks, download).
    pub processing: Surface,

    /// Template asset path. Default: `public/template.docx`.
    pub template_path: PathBuf,

    /// Wait between two task-status checks. Default: 1.5 s.
    pub poll_interval: Duration,

    /// Maximum number of task-status checks. Default: 15.
    ///
    /// With the default interval a task gets roughly 21 s to finish before
    /// the run fails with [`MemoError::PollingTimeout`].
    pub poll_max_attempts: u32,

    /// Per-request HTTP timeout. Default: 60 s.
    pub http_timeout: Duration,

    /// Fixed owner password. `None` draws a fresh random one per run.
    pub owner_password: Option<String>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("generation", &self.generation)
            .field("processing", &self.processing)
            .field("template_path", &self.template_path)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("http_timeout", &self.http_timeout)
            .field("owner_password", &self.owner_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder with every default applied.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, MemoError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// Unset optional keys keep their defaults; unparsable numbers are a
    /// configuration error rather than being silently ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MemoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder()
            .generation_credentials(
                get(env::DOCGEN_CLIENT_ID).unwrap_or_default(),
                get(env::DOCGEN_CLIENT_SECRET).unwrap_or_default(),
            )
            .processing_credentials(
                get(env::PDF_CLIENT_ID).unwrap_or_default(),
                get(env::PDF_CLIENT_SECRET).unwrap_or_default(),
            );

        if let Some(url) = get(env::DOCGEN_BASE_URL) {
            builder = builder.generation_base_url(url);
        }
        if let Some(url) = get(env::PDF_BASE_URL) {
            builder = builder.processing_base_url(url);
        }
        if let Some(path) = get(env::TEMPLATE_PATH) {
            builder = builder.template_path(path);
        }
        if let Some(ms) = get(env::POLL_INTERVAL_MS) {
            builder = builder.poll_interval_ms(parse_number(env::POLL_INTERVAL_MS, &ms)?);
        }
        if let Some(n) = get(env::POLL_MAX_ATTEMPTS) {
            builder = builder.poll_max_attempts(parse_number(env::POLL_MAX_ATTEMPTS, &n)?);
        }
        if let Some(secs) = get(env::HTTP_TIMEOUT_SECS) {
            builder = builder.http_timeout_secs(parse_number(env::HTTP_TIMEOUT_SECS, &secs)?);
        }
        if let Some(pwd) = get(env::OWNER_PASSWORD) {
            builder = builder.owner_password(pwd);
        }

        builder.build()
    }

    /// Client secrets and the owner password, for scrubbing messages.
    /// Client ids are identifiers, not secrets.
    pub fn secrets(&self) -> Vec<String> {
        let mut secrets = vec![
            self.generation.credentials.client_secret().to_string(),
            self.processing.credentials.client_secret().to_string(),
        ];
        if let Some(ref pwd) = self.owner_password {
            secrets.push(pwd.clone());
        }
        secrets
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, MemoError> {
    raw.trim()
        .parse()
        .map_err(|_| MemoError::Configuration(format!("{key} must be a number, got '{raw}'")))
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    generation_base_url: String,
    processing_base_url: String,
    generation_credentials: Option<Credentials>,
    processing_credentials: Option<Credentials>,
    template_path: PathBuf,
    poll_interval: Duration,
    poll_max_attempts: u32,
    http_timeout: Duration,
    owner_password: Option<String>,
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self {
            generation_base_url: DEFAULT_BASE_URL.to_string(),
            processing_base_url: DEFAULT_BASE_URL.to_string(),
            generation_credentials: None,
            processing_credentials: None,
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            poll_interval: Duration::from_millis(1500),
            poll_max_attempts: 15,
            http_timeout: Duration::from_secs(60),
            owner_password: None,
        }
    }
}

impl ServiceConfigBuilder {
    pub fn generation_base_url(mut self, url: impl Into<String>) -> Self {
        self.generation_base_url = url.into();
        self
    }

    pub fn processing_base_url(mut self, url: impl Into<String>) -> Self {
        self.processing_base_url = url.into();
        self
    }

    /// Point both surfaces at one host.
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.generation_base_url(url.clone()).processing_base_url(url)
    }

    pub fn generation_credentials(
        mut self,
        client_id: impl AsRef<str>,
        client_secret: impl AsRef<str>,
    ) -> Self {
        self.generation_credentials = Credentials::new(client_id, client_secret);
        self
    }

    pub fn processing_credentials(
        mut self,
        client_id: impl AsRef<str>,
        client_secret: impl AsRef<str>,
    ) -> Self {
        self.processing_credentials = Credentials::new(client_id, client_secret);
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval = Duration::from_millis(ms);
        self
    }

    pub fn poll_max_attempts(mut self, n: u32) -> Self {
        self.poll_max_attempts = n;
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout = Duration::from_secs(secs);
        self
    }

    pub fn owner_password(mut self, pwd: impl Into<String>) -> Self {
        let pwd = pwd.into();
        self.owner_password = if pwd.trim().is_empty() { None } else { Some(pwd) };
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, MemoError> {
        let generation_credentials = self.generation_credentials.ok_or_else(|| {
            MemoError::Configuration(format!(
                "missing document generation credentials (set {} and {})",
                env::DOCGEN_CLIENT_ID,
                env::DOCGEN_CLIENT_SECRET
            ))
        })?;
        let processing_credentials = self.processing_credentials.ok_or_else(|| {
            MemoError::Configuration(format!(
                "missing PDF services credentials (set {} and {})",
                env::PDF_CLIENT_ID,
                env::PDF_CLIENT_SECRET
            ))
        })?;

        for (name, url) in [
            ("generation", &self.generation_base_url),
            ("processing", &self.processing_base_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(MemoError::Configuration(format!(
                    "{name} base URL '{url}' is not a valid URL"
                )));
            }
        }
        if self.poll_max_attempts == 0 {
            return Err(MemoError::Configuration("poll attempts must be ≥ 1".into()));
        }
        if self.http_timeout.is_zero() {
            return Err(MemoError::Configuration("HTTP timeout must be ≥ 1s".into()));
        }

        Ok(ServiceConfig {
            generation: Surface {
                base_url: self.generation_base_url,
                credentials: generation_credentials,
            },
            processing: Surface {
                base_url: self.processing_base_url,
                credentials: processing_credentials,
            },
            template_path: self.template_path,
            poll_interval: self.poll_interval,
            poll_max_attempts: self.poll_max_attempts,
            http_timeout: self.http_timeout,
            owner_password: self.owner_password,
        })
    }
}
