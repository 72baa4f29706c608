/// Failures of the OAuth client. Raw transport errors never escape; they are
/// folded into [`OAuthError::Transport`].
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Required application credentials are missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The `state` returned with the code is not the one last issued.
    #[error("authorization state mismatch, start the login again")]
    StateMismatch,

    #[error("token exchange rejected ({status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("token refresh rejected ({status}): {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("no refresh token stored, log in again")]
    NoRefreshToken,

    /// No usable access token, an interactive login is required.
    #[error("not logged in, run the login flow first")]
    NotAuthenticated,

    #[error("token endpoint returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to persist credentials: {0}")]
    Persistence(String),
}

impl OAuthError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport("request timed out".into())
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    /// The operator has to log in again before this can succeed.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::StateMismatch
                | Self::TokenExchange { .. }
                | Self::TokenRefresh { .. }
                | Self::NoRefreshToken
                | Self::NotAuthenticated
        )
    }
}
