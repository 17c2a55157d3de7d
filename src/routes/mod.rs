//! Route classification
//!
//! Maps `(method, path)` onto a [`RouteClass`] through an explicit, ordered
//! rule table, first match wins. The table is the single source of truth for
//! access precedence: overlapping patterns exist (`/api/login` sits under
//! `/api/`), so rule order is externally observable behavior and must not
//! be shuffled.

use http::Method;

/// Path the pipeline redirects unauthenticated browsers to
pub const LOGIN_PATH: &str = "/login";

/// Category governing the access rules for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Pages served without authentication (login view)
    PublicPage,
    /// API endpoints reachable before login (`/csrf-token`, `/api/login`)
    PublicApi,
    /// Application pages behind the gate (catch-all entry point)
    ProtectedPage,
    /// API endpoints behind the gate
    ProtectedApi,
    /// Static assets served without authentication
    StaticPublic,
    /// Static assets behind the gate
    StaticProtected,
}

impl RouteClass {
    /// Whether the gate demands an authenticated session for this class
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        matches!(
            self,
            Self::ProtectedPage | Self::ProtectedApi | Self::StaticProtected
        )
    }

    /// Whether callers of this class expect machine-readable responses
    #[must_use]
    pub const fn is_api(self) -> bool {
        matches!(self, Self::PublicApi | Self::ProtectedApi)
    }
}

/// Method-plus-path predicate for one rule
#[derive(Debug, Clone)]
pub enum PathRule {
    /// Exact path, optionally restricted to one method
    Exact {
        /// Required method, or `None` for any
        method: Option<Method>,
        /// Full path to match
        path: String,
    },
    /// The prefix itself and everything below it (`/assets`, `/assets/x`)
    Subtree(String),
    /// Strictly below the prefix (`/api/x` but not `/api`)
    Under(String),
    /// `/login`, `/login/*`, and `/logout`: everything routed to the
    /// login view
    LoginTree,
    /// Catch-all fallback; must be the last rule
    Any,
}

impl PathRule {
    fn matches(&self, method: &Method, path: &str) -> bool {
        match self {
            Self::Exact {
                method: required,
                path: exact,
            } => {
                required.as_ref().is_none_or(|m| m == method) && path == exact
            }
            Self::Subtree(prefix) => {
                path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            }
            Self::Under(prefix) => {
                path.starts_with(prefix.as_str())
                    && path.as_bytes().get(prefix.len()) == Some(&b'/')
            }
            Self::LoginTree => {
                path == "/login" || path == "/logout" || path.starts_with("/login/")
            }
            Self::Any => true,
        }
    }
}

/// One immutable classification rule
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// Rule name, for logs and shadowing diagnostics
    pub name: &'static str,
    /// The method/path predicate
    pub rule: PathRule,
    /// Class assigned when the predicate matches
    pub class: RouteClass,
}

/// Ordered rule table, read-only after startup
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RoutePattern>,
}

impl RouteTable {
    /// Build the table with the given static-asset URL prefixes
    ///
    /// Precedence (first match wins):
    /// 1. `GET /csrf-token`: public API
    /// 2. public asset subtree: public static
    /// 3. `/login`, `/login/*`, `/logout`: public page
    /// 4. `/api/login`: public API (login submission, pre-auth)
    /// 5. anything else under `/api/`: protected API
    /// 6. protected asset subtree: protected static
    /// 7. everything else: protected page
    #[must_use]
    pub fn new(public_assets: &str, protected_assets: &str) -> Self {
        Self {
            rules: vec![
                RoutePattern {
                    name: "csrf-token",
                    rule: PathRule::Exact {
                        method: Some(Method::GET),
                        path: "/csrf-token".to_string(),
                    },
                    class: RouteClass::PublicApi,
                },
                RoutePattern {
                    name: "static-public",
                    rule: PathRule::Subtree(public_assets.to_string()),
                    class: RouteClass::StaticPublic,
                },
                RoutePattern {
                    name: "login-tree",
                    rule: PathRule::LoginTree,
                    class: RouteClass::PublicPage,
                },
                RoutePattern {
                    name: "api-login",
                    rule: PathRule::Exact {
                        method: None,
                        path: "/api/login".to_string(),
                    },
                    class: RouteClass::PublicApi,
                },
                RoutePattern {
                    name: "api",
                    rule: PathRule::Under("/api".to_string()),
                    class: RouteClass::ProtectedApi,
                },
                RoutePattern {
                    name: "static-protected",
                    rule: PathRule::Subtree(protected_assets.to_string()),
                    class: RouteClass::StaticProtected,
                },
                RoutePattern {
                    name: "app",
                    rule: PathRule::Any,
                    class: RouteClass::ProtectedPage,
                },
            ],
        }
    }

    /// Classify a request; total over all well-formed inputs
    #[must_use]
    pub fn classify(&self, method: &Method, path: &str) -> RouteClass {
        self.rules
            .iter()
            .find(|pattern| pattern.rule.matches(method, path))
            .map_or(RouteClass::ProtectedPage, |pattern| pattern.class)
    }

    /// The ordered rules, for diagnostics and shadowing tests
    #[must_use]
    pub fn rules(&self) -> &[RoutePattern] {
        &self.rules
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new("/assets", "/private")
    }
}
