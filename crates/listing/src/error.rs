use std::fmt;

use serde::Serialize;

/// Which step of the publish chain failed. Tells the operator which remote
/// resources may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStage {
    Auth,
    Inventory,
    Offer,
    Publish,
}

impl PublishStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Inventory => "inventory",
            Self::Offer => "offer",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDetail {
    /// Non-success HTTP response, body kept verbatim.
    Status { status: u16, body: String },
    /// Offer created but the response carried no `offerId`.
    MissingOfferId,
    /// The platform did not answer within the request timeout.
    Timeout,
    Transport(String),
    /// No usable token; the operator must log in.
    Auth(String),
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::MissingOfferId => f.write_str("missing_offer_id"),
            Self::Timeout => f.write_str("timeout"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Auth(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage}: {detail}")]
pub struct PublishError {
    pub stage: PublishStage,
    pub detail: FailureDetail,
}

impl PublishError {
    pub fn new(stage: PublishStage, detail: FailureDetail) -> Self {
        Self { stage, detail }
    }

    pub(crate) fn transport(stage: PublishStage, err: reqwest::Error) -> Self {
        let detail = if err.is_timeout() {
            FailureDetail::Timeout
        } else {
            FailureDetail::Transport(err.to_string())
        };
        Self::new(stage, detail)
    }

    pub fn is_timeout(&self) -> bool {
        self.detail == FailureDetail::Timeout
    }
}

/// A listing field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("price must be a positive number, got {0:?}")]
    Price(String),
    #[error("quantity must be a positive whole number, got {0:?}")]
    Quantity(String),
    #[error("unknown condition {0:?}")]
    Condition(String),
    #[error("at least one image is required")]
    NoImages,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_stage_and_detail() {
        let err = PublishError::new(PublishStage::Offer, FailureDetail::MissingOfferId);
        assert_eq!(err.to_string(), "offer: missing_offer_id");

        let err = PublishError::new(PublishStage::Inventory, FailureDetail::Status {
            status: 400,
            body: r#"{"errors":[{"errorId":25002}]}"#.into(),
        });
        assert_eq!(
            err.to_string(),
            r#"inventory: HTTP 400: {"errors":[{"errorId":25002}]}"#
        );

        let err = PublishError::new(PublishStage::Publish, FailureDetail::Timeout);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "publish: timeout");
    }
}
