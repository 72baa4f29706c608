use crate::types::Environment;

/// Every URL one environment needs, resolved once and passed around so a flow
/// can never mix sandbox and production hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub scope_prefix: String,
}

impl Endpoints {
    /// Built-in platform URLs for `env`.
    pub fn builtin(env: Environment) -> Self {
        match env {
            Environment::Sandbox => Self {
                auth_url: "https://auth.sandbox.ebay.com/oauth2/authorize".into(),
                token_url: "https://api.sandbox.ebay.com/identity/v1/oauth2/token".into(),
                api_base_url: "https://api.sandbox.ebay.com".into(),
                scope_prefix: "https://api.sandbox.ebay.com/oauth/api_scope".into(),
            },
            Environment::Production => Self {
                auth_url: "https://auth.ebay.com/oauth2/authorize".into(),
                token_url: "https://api.ebay.com/identity/v1/oauth2/token".into(),
                api_base_url: "https://api.ebay.com".into(),
                scope_prefix: "https://api.ebay.com/oauth/api_scope".into(),
            },
        }
    }

    /// Endpoints that send every call to one base URL (a local mock server).
    pub fn single_host(base: &str, scope_prefix: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/oauth2/authorize"),
            token_url: format!("{base}/identity/v1/oauth2/token"),
            api_base_url: base.to_string(),
            scope_prefix: scope_prefix.to_string(),
        }
    }

    /// Scopes requested for listing: base API access, inventory, account.
    pub fn scopes(&self) -> Vec<String> {
        vec![
            self.scope_prefix.clone(),
            format!("{}/sell.inventory", self.scope_prefix),
            format!("{}/sell.account", self.scope_prefix),
        ]
    }

    /// Scopes joined the way the authorize and token endpoints expect.
    pub fn scope_param(&self) -> String {
        self.scopes().join(" ")
    }
}

/// Resolve endpoints for `env`.
///
/// Priority:
/// 1. Environment variables (`SNAPLIST_EBAY_{SANDBOX,PRODUCTION}_{AUTH_URL,TOKEN_URL,API_URL}`)
/// 2. Built-in defaults
pub fn resolve_endpoints(env: Environment) -> Endpoints {
    let mut endpoints = Endpoints::builtin(env);

    let prefix = format!("SNAPLIST_EBAY_{}_", env.as_str().to_uppercase());
    if let Ok(v) = std::env::var(format!("{prefix}AUTH_URL")) {
        endpoints.auth_url = v;
    }
    if let Ok(v) = std::env::var(format!("{prefix}TOKEN_URL")) {
        endpoints.token_url = v;
    }
    if let Ok(v) = std::env::var(format!("{prefix}API_URL")) {
        endpoints.api_base_url = v;
    }

    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environments_share_no_hosts() {
        let sandbox = Endpoints::builtin(Environment::Sandbox);
        let production = Endpoints::builtin(Environment::Production);

        for url in [
            &production.auth_url,
            &production.token_url,
            &production.api_base_url,
            &production.scope_prefix,
        ] {
            assert!(!url.contains("sandbox"), "{url}");
        }
        for url in [
            &sandbox.auth_url,
            &sandbox.token_url,
            &sandbox.api_base_url,
            &sandbox.scope_prefix,
        ] {
            assert!(url.contains(".sandbox.ebay.com"), "{url}");
        }
    }

    #[test]
    fn scopes_follow_prefix() {
        let e = Endpoints::builtin(Environment::Production);
        assert_eq!(e.scopes(), vec![
            "https://api.ebay.com/oauth/api_scope".to_string(),
            "https://api.ebay.com/oauth/api_scope/sell.inventory".to_string(),
            "https://api.ebay.com/oauth/api_scope/sell.account".to_string(),
        ]);
        assert_eq!(e.scope_param().split(' ').count(), 3);
    }

    #[test]
    fn single_host_strips_trailing_slash() {
        let e = Endpoints::single_host("http://127.0.0.1:4000/", "scope");
        assert_eq!(e.api_base_url, "http://127.0.0.1:4000");
        assert_eq!(e.token_url, "http://127.0.0.1:4000/identity/v1/oauth2/token");
    }
}
