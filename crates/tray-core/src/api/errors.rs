use crate::errors::TrayError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered 401; the token is no longer valid.
    #[error("Authentication expired")]
    AuthExpired,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{detail}")]
    Http { status: u16, detail: String },

    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Credentials refused by `POST /api/admin/login`.
    #[error("Login failed: {detail}")]
    LoginRejected { detail: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ApiError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }
}

impl TrayError for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::AuthExpired => "API_AUTH_EXPIRED",
            ApiError::Network { .. } => "API_NETWORK_FAILURE",
            ApiError::Http { .. } => "API_HTTP_ERROR",
            ApiError::Decode { .. } => "API_DECODE_ERROR",
            ApiError::LoginRejected { .. } => "API_LOGIN_REJECTED",
            ApiError::InvalidRequest { .. } => "API_INVALID_REQUEST",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ApiError::AuthExpired | ApiError::LoginRejected { .. } | ApiError::InvalidRequest { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_expired() {
        let error = ApiError::AuthExpired;
        assert!(error.is_auth_expired());
        assert_eq!(error.error_code(), "API_AUTH_EXPIRED");
        assert!(error.is_user_error());
    }

    #[test]
    fn test_http_error_displays_detail() {
        let error = ApiError::Http {
            status: 409,
            detail: "Worker already paused".to_string(),
        };
        assert_eq!(error.to_string(), "Worker already paused");
        assert!(!error.is_auth_expired());
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_network_error() {
        let error = ApiError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Network error: connection refused");
        assert_eq!(error.error_code(), "API_NETWORK_FAILURE");
    }
}
