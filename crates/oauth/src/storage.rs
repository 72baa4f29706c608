use std::{
    fmt,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use {
    serde::{Deserialize, Deserializer, Serialize},
    snaplist_config::{config_dir, load_document, save_document},
};

use crate::types::Environment;

/// Seconds before expiry at which an access token is treated as stale.
const EXPIRY_SKEW_SECS: u64 = 300;

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Application credentials plus the operator's OAuth tokens.
///
/// Fields written as `null` by older settings forms load as empty.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub app_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dev_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cert_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp when `user_token` expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<u64>,
    /// Nonce issued with the last authorization URL, consumed by the exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: bool| if v { "[REDACTED]" } else { "[EMPTY]" };
        f.debug_struct("CredentialRecord")
            .field("app_id", &self.app_id)
            .field("dev_id", &self.dev_id)
            .field("cert_id", &redact(!self.cert_id.is_empty()))
            .field("environment", &self.environment)
            .field("user_token", &redact(self.user_token.is_some()))
            .field("refresh_token", &redact(self.refresh_token.is_some()))
            .field("token_expires_at", &self.token_expires_at)
            .field("oauth_state", &self.oauth_state.is_some())
            .finish()
    }
}

impl CredentialRecord {
    /// App id, dev id and cert id are all present.
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.dev_id.is_empty() && !self.cert_id.is_empty()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn stored_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The access token is past its expiry, or within the refresh skew of it.
    /// Tokens without a known expiry are assumed fresh.
    pub fn token_is_stale(&self, now: u64) -> bool {
        self.token_expires_at
            .is_some_and(|at| now.saturating_add(EXPIRY_SKEW_SECS) >= at)
    }

    pub fn token_is_expired(&self, now: u64) -> bool {
        self.token_expires_at.is_some_and(|at| now >= at)
    }

    /// Drop every token field, keeping the application credentials.
    pub fn clear_tokens(&mut self) {
        self.user_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
        self.oauth_state = None;
    }

    /// Replace the application credentials. Tokens only survive when the
    /// environment is unchanged.
    pub fn set_app_credentials(
        &mut self,
        app_id: String,
        dev_id: String,
        cert_id: String,
        environment: Environment,
    ) {
        if environment != self.environment {
            self.clear_tokens();
        }
        self.app_id = app_id;
        self.dev_id = dev_id;
        self.cert_id = cert_id;
        self.environment = environment;
    }
}

/// File-backed credential storage at `~/.config/snaplist/credentials.json`.
///
/// A plain handle: every operation re-reads the file, nothing is cached.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            path: config_dir().join("credentials.json"),
        }
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record, or an empty one when the file is missing or unreadable.
    pub fn load(&self) -> CredentialRecord {
        load_document(&self.path)
    }

    pub fn save(&self, record: &CredentialRecord) -> anyhow::Result<()> {
        save_document(&self.path, record)
    }

    /// Load, apply `f`, save. Returns the saved record.
    pub fn update(&self, f: impl FnOnce(&mut CredentialRecord)) -> anyhow::Result<CredentialRecord> {
        let mut record = self.load();
        f(&mut record);
        self.save(&record)?;
        Ok(record)
    }

    pub fn is_configured(&self) -> bool {
        self.load().is_configured()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_defaults() {
        let (_dir, store) = store();
        let record = store.load();
        assert_eq!(record, CredentialRecord::default());
        assert_eq!(record.environment, Environment::Sandbox);
        assert!(!record.is_configured());
        assert!(!record.is_authenticated());
    }

    #[test]
    fn save_and_reload_every_field() {
        let (_dir, store) = store();
        let record = CredentialRecord {
            app_id: "Snaplist-App-PRD-1a2b3c".into(),
            dev_id: "dev-42".into(),
            cert_id: "PRD-cert-secret".into(),
            environment: Environment::Production,
            user_token: Some("v^1.1#i^1#token".into()),
            refresh_token: Some("v^1.1#r^1#refresh".into()),
            token_expires_at: Some(1_900_000_000),
            oauth_state: Some("nonce".into()),
        };
        store.save(&record).unwrap();
        assert_eq!(store.load(), record);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), CredentialRecord::default());
    }

    #[test]
    fn null_fields_load_as_empty() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"app_id": null, "dev_id": "d", "cert_id": null, "environment": null}"#,
        )
        .unwrap();
        let record = store.load();
        assert_eq!(record.app_id, "");
        assert_eq!(record.dev_id, "d");
        assert_eq!(record.environment, Environment::Sandbox);
    }

    #[test]
    fn is_configured_needs_all_three_ids() {
        for mask in 0u8..8 {
            let pick = |bit: u8| {
                if mask & bit != 0 {
                    "x".to_string()
                } else {
                    String::new()
                }
            };
            let record = CredentialRecord {
                app_id: pick(1),
                dev_id: pick(2),
                cert_id: pick(4),
                ..Default::default()
            };
            assert_eq!(record.is_configured(), mask == 7, "mask {mask:03b}");
        }
    }

    #[test]
    fn update_persists_change() {
        let (_dir, store) = store();
        store.update(|r| r.app_id = "app".into()).unwrap();
        assert_eq!(store.load().app_id, "app");
    }

    #[test]
    fn switching_environment_clears_tokens() {
        let mut record = CredentialRecord {
            user_token: Some("t".into()),
            refresh_token: Some("r".into()),
            ..Default::default()
        };
        record.set_app_credentials("a".into(), "d".into(), "c".into(), Environment::Sandbox);
        assert!(record.is_authenticated());

        record.set_app_credentials("a".into(), "d".into(), "c".into(), Environment::Production);
        assert!(!record.is_authenticated());
        assert!(record.refresh_token.is_none());
    }

    #[test]
    fn staleness_uses_skew() {
        let record = CredentialRecord {
            user_token: Some("t".into()),
            token_expires_at: Some(1_000),
            ..Default::default()
        };
        assert!(!record.token_is_stale(600));
        assert!(record.token_is_stale(700));
        assert!(!record.token_is_expired(999));
        assert!(record.token_is_expired(1_000));

        let no_expiry = CredentialRecord {
            user_token: Some("t".into()),
            ..Default::default()
        };
        assert!(!no_expiry.token_is_stale(u64::MAX - EXPIRY_SKEW_SECS));
    }

    #[test]
    fn debug_redacts_secrets() {
        let record = CredentialRecord {
            cert_id: "super-secret-cert".into(),
            user_token: Some("super-secret-token".into()),
            ..Default::default()
        };
        let out = format!("{record:?}");
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("super-secret"));
    }
}
