use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration (`snaplist.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnaplistConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub oauth: OAuthSettings,
    pub updates: UpdatesConfig,
}

/// Upload receiver / operator HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind. `0.0.0.0` so phones on the LAN can reach it.
    pub bind: String,
    pub port: u16,
    /// Where uploaded photos are stored. Relative paths resolve against the
    /// working directory.
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Host used in public image URLs and the QR code. Auto-detected from the
    /// LAN interface when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_host: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
            public_host: None,
        }
    }
}

/// Outbound HTTP settings shared by the OAuth client and listing publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    /// Redirect URI registered with the platform (eBay calls it an RuName).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// GitHub `owner/name` whose releases are checked.
    pub repo: String,
    pub check_on_start: bool,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            repo: "snaplist/snaplist".into(),
            check_on_start: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: SnaplistConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [oauth]
            redirect_uri = "Jane_Doe-JaneDoe-Snapli-abcde"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.server.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(cfg.http.timeout_secs, 30);
        assert_eq!(
            cfg.oauth.redirect_uri.as_deref(),
            Some("Jane_Doe-JaneDoe-Snapli-abcde")
        );
        assert!(cfg.updates.check_on_start);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let http = HttpConfig { timeout_secs: 0 };
        assert_eq!(http.timeout(), Duration::from_secs(1));
    }
}
