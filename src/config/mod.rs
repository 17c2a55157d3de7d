//! Configuration management
//!
//! Settings are loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `GATEHOUSE_` prefix,
//!    `__` as the nesting separator)
//! 2. `./gatehouse.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! # Example configuration
//!
//! ```toml
//! # gatehouse.toml
//! [service]
//! name = "gatehouse"
//! port = 3000
//!
//! [session]
//! cookie_name = "gatehouse_session"
//! idle_timeout_secs = 3600
//! rolling = true
//!
//! [csrf]
//! header_name = "x-csrf-token"
//! skip_paths = []
//!
//! [assets]
//! public_prefix = "/assets"
//! public_dir = "./public"
//! protected_prefix = "/private"
//! protected_dir = "./private"
//! ```

use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::csrf::CSRF_HEADER_NAME;

/// Default session cookie name
pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

/// Service identity and listen address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name, used in logs
    pub name: String,
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "gatehouse".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Cookie and session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Cookie name for the session id
    pub cookie_name: String,
    /// Cookie path
    pub cookie_path: String,
    /// Idle timeout in seconds; sessions expire after this much inactivity
    pub idle_timeout_secs: u64,
    /// Reset the expiry on every request bearing a live session
    pub rolling: bool,
    /// HTTP-only cookie (recommended: true)
    pub http_only: bool,
    /// Secure cookie (HTTPS only)
    pub secure: bool,
    /// SameSite policy
    pub same_site: SameSitePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            idle_timeout_secs: 3600,
            rolling: true,
            http_only: true,
            secure: !cfg!(debug_assertions),
            same_site: SameSitePolicy::Lax,
        }
    }
}

impl SessionSettings {
    /// Maximum effective idle timeout, one century
    ///
    /// Large enough to mean "never expires", small enough that adding it to
    /// a current timestamp stays inside chrono's representable range.
    const MAX_IDLE_TIMEOUT_SECS: i64 = 100 * 365 * 24 * 3600;

    /// Idle timeout as a [`chrono::Duration`]
    ///
    /// Out-of-range values clamp to the century cap instead of failing; the
    /// middleware calls this per request and a mis-sized config value must
    /// not take requests down.
    #[must_use]
    pub fn idle_timeout(&self) -> chrono::Duration {
        let secs = i64::try_from(self.idle_timeout_secs)
            .unwrap_or(Self::MAX_IDLE_TIMEOUT_SECS)
            .min(Self::MAX_IDLE_TIMEOUT_SECS);
        chrono::Duration::try_seconds(secs).unwrap_or_default()
    }
}

/// Cookie SameSite policy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    /// Strict same-site policy
    Strict,
    /// Lax same-site policy (recommended)
    #[default]
    Lax,
    /// No same-site restriction (requires Secure)
    None,
}

impl SameSitePolicy {
    /// Convert to the cookie attribute string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// CSRF guard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
    /// Header name carrying the token on mutating requests
    pub header_name: String,
    /// Paths exempt from validation (webhook-style endpoints)
    pub skip_paths: Vec<String>,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            header_name: CSRF_HEADER_NAME.to_string(),
            skip_paths: vec![],
        }
    }
}

/// Static asset mount points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// URL prefix for assets served without authentication
    pub public_prefix: String,
    /// Directory backing the public prefix
    pub public_dir: PathBuf,
    /// URL prefix for assets behind the gate
    pub protected_prefix: String,
    /// Directory backing the protected prefix
    pub protected_dir: PathBuf,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            public_prefix: "/assets".to_string(),
            public_dir: PathBuf::from("./public"),
            protected_prefix: "/private".to_string(),
            protected_dir: PathBuf::from("./private"),
        }
    }
}

/// Demo credentials for the bundled fixed-credential login service
///
/// Real deployments inject their own `LoginService`; these defaults exist so
/// the binary runs out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Accepted username
    pub username: String,
    /// Accepted password
    pub password: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "change-me".to_string(),
        }
    }
}

/// Complete gatehouse configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    /// Service identity and listen address
    pub service: ServiceSettings,
    /// Session and cookie settings
    pub session: SessionSettings,
    /// CSRF guard settings
    pub csrf: CsrfSettings,
    /// Static asset mount points
    pub assets: AssetSettings,
    /// Demo login credentials
    pub auth: AuthSettings,
}

impl GatehouseConfig {
    /// Load configuration from `./gatehouse.toml` and the environment
    ///
    /// # Errors
    ///
    /// Returns an error when a source is present but malformed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("gatehouse.toml")
    }

    /// Load configuration from a specific TOML file and the environment
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error when a source is present but malformed.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GATEHOUSE_").split("__"))
            .extract()?;
        Ok(config)
    }
}
