//! Error kinds.
//!
//! `ApiError` is what the transport reports.  `ClientError` is the small set
//! of user-visible outcomes every transport failure is folded into at the
//! core boundary; nothing past the core sees an `ApiError`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 from any endpoint.
    #[error("session rejected by backend")]
    Unauthorized,
    /// 403, only meaningful for login.
    #[error("access denied")]
    Forbidden,
    /// 400; the session endpoint answers this for unknown tokens.
    #[error("bad request")]
    BadRequest,
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::BAD_REQUEST => ApiError::BadRequest,
            other => ApiError::Status(other),
        }
    }

    /// True when the backend says the session token is no longer valid.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::BadRequest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No session: the login prompt is raised and the action is blocked.
    #[error("login required")]
    AuthRequired,
    #[error("Your session has expired. Please login again.")]
    SessionExpired,
    #[error("An error has occurred.")]
    RequestFailed,
    /// The action was not applicable (e.g. voting for the playing song).
    #[error("nothing to do")]
    ValidationSkipped,
    #[error("Access denied: you are not allowed to use this jukebox.")]
    AccessDenied,
    #[error("Your login failed. Please try again.")]
    LoginFailed,
}

impl ClientError {
    /// Message for the error surface, if this kind shows one.
    pub fn notice(&self) -> Option<String> {
        match self {
            ClientError::AuthRequired | ClientError::ValidationSkipped => None,
            other => Some(other.to_string()),
        }
    }

    /// Fold a failed authenticated command into its user-visible kind.
    pub fn from_command_failure(err: &ApiError) -> Self {
        match err {
            ApiError::Unauthorized => ClientError::SessionExpired,
            _ => ClientError::RequestFailed,
        }
    }

    pub fn from_login_failure(err: &ApiError) -> Self {
        match err {
            ApiError::Forbidden => ClientError::AccessDenied,
            _ => ClientError::LoginFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert!(ApiError::BadRequest.is_session_invalid());
        assert!(!ApiError::Forbidden.is_session_invalid());
    }

    #[test]
    fn test_command_failure_kinds() {
        assert_eq!(
            ClientError::from_command_failure(&ApiError::Unauthorized),
            ClientError::SessionExpired
        );
        assert_eq!(
            ClientError::from_command_failure(&ApiError::Forbidden),
            ClientError::RequestFailed
        );
        assert_eq!(
            ClientError::from_login_failure(&ApiError::Forbidden),
            ClientError::AccessDenied
        );
        assert_eq!(
            ClientError::from_login_failure(&ApiError::Status(StatusCode::BAD_GATEWAY)),
            ClientError::LoginFailed
        );
    }

    #[test]
    fn test_silent_kinds_have_no_notice() {
        assert_eq!(ClientError::ValidationSkipped.notice(), None);
        assert_eq!(ClientError::AuthRequired.notice(), None);
        assert_eq!(
            ClientError::SessionExpired.notice().as_deref(),
            Some("Your session has expired. Please login again.")
        );
    }
}
