//! Client-side errors. These never leave an adapter: `adapter::Guarded`
//! converts them into `ProviderResult::Failure`.
use guide_core::FailureKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("AUTH/{0}")]
    Auth(String),

    #[error("RATE/{0}")]
    RateLimited(String),

    #[error("REQUEST/{0}")]
    BadRequest(String),

    #[error("UPSTREAM/{status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("NETWORK/{0}")]
    Network(String),

    #[error("DECODE/{0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Auth(_) => FailureKind::Auth,
            ClientError::RateLimited(_) => FailureKind::RateLimited,
            ClientError::BadRequest(_) => FailureKind::Upstream,
            ClientError::Upstream { .. } => FailureKind::Upstream,
            ClientError::Network(_) => FailureKind::Network,
            ClientError::InvalidResponse(_) => FailureKind::InvalidResponse,
        }
    }

    /// Server-side and transport failures; what most providers retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Upstream { .. } | ClientError::Network(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            crate::http::classify_status(status.as_u16(), &err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_transience() {
        assert_eq!(ClientError::Auth("x".into()).kind(), FailureKind::Auth);
        assert!(!ClientError::Auth("x".into()).is_transient());
        assert!(!ClientError::RateLimited("x".into()).is_transient());
        assert!(ClientError::Network("reset".into()).is_transient());
        assert!(ClientError::Upstream { status: 503, message: "x".into() }.is_transient());
        assert!(!ClientError::InvalidResponse("x".into()).is_transient());
    }
}
