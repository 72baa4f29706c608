//! Authorization code flow against the platform's identity service.
//!
//! The credential record moves through three states: no token (build an
//! authorization URL, remember its `state`), exchanging (verify `state`, trade
//! the code for tokens), and authenticated (refresh when the access token
//! goes stale).

use std::fmt;

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    reqwest::{Client, Response, header},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    endpoints::{Endpoints, resolve_endpoints},
    error::OAuthError,
    state::{generate_state, states_match},
    storage::{CredentialRecord, CredentialStore, now_secs},
    types::{Environment, TokenResponse},
};

/// A usable access token and the endpoints of the environment that issued it.
#[derive(Clone)]
pub struct AuthorizedSession {
    pub access_token: Secret<String>,
    pub environment: Environment,
    pub endpoints: Endpoints,
}

impl fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("access_token", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// `Authorization` header value for the token endpoint.
pub fn basic_authorization(app_id: &str, cert_id: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{app_id}:{cert_id}")))
}

fn require_app_id(record: &CredentialRecord) -> Result<(), OAuthError> {
    if record.app_id.is_empty() {
        return Err(OAuthError::Configuration("app_id is not set".into()));
    }
    Ok(())
}

fn require_client_credentials(record: &CredentialRecord) -> Result<(), OAuthError> {
    require_app_id(record)?;
    if record.cert_id.is_empty() {
        return Err(OAuthError::Configuration("cert_id is not set".into()));
    }
    Ok(())
}

fn apply_tokens(record: &mut CredentialRecord, tokens: TokenResponse) {
    record.user_token = Some(tokens.access_token.expose_secret().clone());
    if let Some(refresh) = tokens.refresh_token {
        record.refresh_token = Some(refresh.expose_secret().clone());
    }
    record.token_expires_at = tokens
        .expires_in
        .map(|secs| now_secs().saturating_add(secs));
}

async fn read_tokens(resp: Response) -> Result<TokenResponse, OAuthError> {
    resp.json::<TokenResponse>()
        .await
        .map_err(|e| OAuthError::InvalidResponse(e.to_string()))
}

/// OAuth client bound to one credential store.
///
/// Each operation loads the record once and resolves the endpoints of that
/// record's environment; all calls of the operation use those endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    store: CredentialStore,
    http: Client,
    endpoints_override: Option<Endpoints>,
}

impl OAuthClient {
    pub fn new(store: CredentialStore, http: Client) -> Self {
        Self {
            store,
            http,
            endpoints_override: None,
        }
    }

    /// Send every call to `endpoints` regardless of environment.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints_override = Some(endpoints);
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn endpoints_for(&self, env: Environment) -> Endpoints {
        self.endpoints_override
            .clone()
            .unwrap_or_else(|| resolve_endpoints(env))
    }

    /// Build the URL the operator opens to grant access.
    ///
    /// Issues a fresh `state` nonce and persists it for the later exchange.
    /// No network call.
    pub fn build_authorization_url(&self, redirect_uri: &str) -> Result<String, OAuthError> {
        let mut record = self.store.load();
        require_app_id(&record)?;
        let endpoints = self.endpoints_for(record.environment);

        let state = generate_state();
        let url = Url::parse_with_params(&endpoints.auth_url, &[
            ("client_id", record.app_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("scope", endpoints.scope_param().as_str()),
            ("state", state.as_str()),
        ])
        .map_err(|e| OAuthError::Configuration(format!("invalid authorization url: {e}")))?;

        record.oauth_state = Some(state);
        self.store.save(&record).map_err(OAuthError::persistence)?;

        debug!(environment = %record.environment, "built authorization url");
        Ok(url.into())
    }

    /// Trade an authorization code for tokens.
    ///
    /// `state` must equal the nonce issued by the last
    /// [`build_authorization_url`](Self::build_authorization_url); the nonce
    /// is consumed on success. On any failure the store is left untouched.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<(), OAuthError> {
        let mut record = self.store.load();
        require_client_credentials(&record)?;

        let issued = record.oauth_state.as_deref().unwrap_or_default();
        if issued.is_empty() || !states_match(issued, state) {
            warn!("authorization callback state does not match the issued state");
            return Err(OAuthError::StateMismatch);
        }

        let endpoints = self.endpoints_for(record.environment);
        let resp = self
            .post_token_request(&record, &endpoints, &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token exchange rejected");
            return Err(OAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let tokens = read_tokens(resp).await?;
        apply_tokens(&mut record, tokens);
        record.oauth_state = None;
        self.store.save(&record).map_err(OAuthError::persistence)?;

        info!(environment = %record.environment, "logged in");
        Ok(())
    }

    /// Refresh the stored access token.
    ///
    /// Returns `Ok(false)` when the platform rejects the refresh or cannot be
    /// reached; the caller decides whether to send the operator back through
    /// login. Errors only when there is nothing to refresh with.
    pub async fn refresh_access_token(&self) -> Result<bool, OAuthError> {
        let mut record = self.store.load();
        let endpoints = self.endpoints_for(record.environment);
        self.refresh_record(&mut record, &endpoints).await
    }

    async fn refresh_record(
        &self,
        record: &mut CredentialRecord,
        endpoints: &Endpoints,
    ) -> Result<bool, OAuthError> {
        let refresh_token = record
            .stored_refresh_token()
            .ok_or(OAuthError::NoRefreshToken)?
            .to_string();
        require_client_credentials(record)?;

        let tokens = match self.request_refresh(record, endpoints, &refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "access token refresh failed");
                return Ok(false);
            },
        };

        apply_tokens(record, tokens);
        self.store.save(record).map_err(OAuthError::persistence)?;
        info!(environment = %record.environment, "access token refreshed");
        Ok(true)
    }

    async fn request_refresh(
        &self,
        record: &CredentialRecord,
        endpoints: &Endpoints,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let scope = endpoints.scope_param();
        let resp = self
            .post_token_request(record, endpoints, &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OAuthError::TokenRefresh {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        read_tokens(resp).await
    }

    /// A token good enough to call the API with, refreshing a stale one.
    ///
    /// A stale token whose refresh fails is still returned while it has not
    /// actually expired. Never starts an interactive login.
    pub async fn authorized_session(&self) -> Result<AuthorizedSession, OAuthError> {
        let mut record = self.store.load();
        let environment = record.environment;
        let endpoints = self.endpoints_for(environment);

        let now = now_secs();
        if record.access_token().is_some() && !record.token_is_stale(now) {
            return session_from(&record, endpoints);
        }

        match self.refresh_record(&mut record, &endpoints).await {
            Ok(true) => return session_from(&record, endpoints),
            Ok(false) | Err(OAuthError::NoRefreshToken) => {},
            Err(e) => return Err(e),
        }

        if !record.token_is_expired(now) {
            return session_from(&record, endpoints);
        }
        Err(OAuthError::NotAuthenticated)
    }

    /// The access token of [`authorized_session`](Self::authorized_session).
    pub async fn valid_access_token(&self) -> Result<String, OAuthError> {
        let session = self.authorized_session().await?;
        Ok(session.access_token.expose_secret().clone())
    }

    async fn post_token_request(
        &self,
        record: &CredentialRecord,
        endpoints: &Endpoints,
        form: &[(&str, &str)],
    ) -> Result<Response, OAuthError> {
        debug!(url = %endpoints.token_url, "token request");
        self.http
            .post(&endpoints.token_url)
            .header(
                header::AUTHORIZATION,
                basic_authorization(&record.app_id, &record.cert_id),
            )
            .form(form)
            .send()
            .await
            .map_err(OAuthError::transport)
    }
}

fn session_from(
    record: &CredentialRecord,
    endpoints: Endpoints,
) -> Result<AuthorizedSession, OAuthError> {
    let token = record.access_token().ok_or(OAuthError::NotAuthenticated)?;
    Ok(AuthorizedSession {
        access_token: Secret::new(token.to_string()),
        environment: record.environment,
        endpoints,
    })
}
