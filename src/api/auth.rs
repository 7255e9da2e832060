//! Register / login / logout against the auth endpoints.
//!
//! Every outcome is folded into [`AuthOutcome`]; transport and server errors
//! never escape as `ApiError`, they become a message (and, when the server
//! points at one, the form field it concerns).

use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{ApiClient, ApiError};
use crate::session::{Session, Tokens, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Email,
    Password,
    General,
}

impl FormField {
    fn from_name(name: &str) -> Self {
        match name {
            "email" => Self::Email,
            "password" => Self::Password,
            _ => Self::General,
        }
    }

    /// Business error codes the server uses for field-specific failures.
    fn from_code(code: &str) -> Self {
        match code {
            "EMAIL_EXISTS" => Self::Email,
            "PASSWORD_INVALID" => Self::Password,
            _ => Self::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSuccess {
    pub message: String,
    pub user: Option<User>,
    pub tokens: Option<Tokens>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthFailure {
    pub field: Option<FormField>,
    pub message: String,
}

impl AuthFailure {
    fn general(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

pub type AuthOutcome = Result<AuthSuccess, AuthFailure>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Required-field check done before anything is sent. Reports the first
    /// missing field.
    pub fn validate(&self) -> Result<(), AuthFailure> {
        if self.email.trim().is_empty() {
            return Err(AuthFailure {
                field: Some(FormField::Email),
                message: "Please enter email".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(AuthFailure {
                field: Some(FormField::Password),
                message: "Please enter password".to_string(),
            });
        }
        Ok(())
    }

    fn body(&self) -> Value {
        json!({ "email": self.email, "password": self.password })
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn signup(&self, session: &mut Session, credentials: &Credentials) -> AuthOutcome {
        credentials.validate()?;

        match self.api.post("auth/register", &credentials.body()).await {
            Ok(resp) => {
                let accepted = resp.get("success").and_then(Value::as_bool) == Some(true)
                    || message_of(&resp) == Some("User registered successfully")
                    || resp.get("access_token").is_some();
                if !accepted {
                    let message = message_of(&resp).unwrap_or("Sign up failed");
                    warn!(reason = message, "sign up rejected");
                    return Err(AuthFailure::general(message));
                }

                let (user, tokens) = credentials_of(&resp);
                session.establish(user.clone(), tokens.as_ref());
                info!(email = %credentials.email, "signed up");
                Ok(AuthSuccess {
                    message: "Sign up successful!".to_string(),
                    user,
                    tokens,
                })
            }
            Err(e) => Err(signup_failure(&e)),
        }
    }

    pub async fn login(&self, session: &mut Session, credentials: &Credentials) -> AuthOutcome {
        credentials.validate()?;

        match self.api.post("auth/login", &credentials.body()).await {
            Ok(resp) => {
                let (user, tokens) = credentials_of(&resp);
                let Some(tokens) = tokens else {
                    return Err(AuthFailure::general(
                        message_of(&resp).unwrap_or("Login failed"),
                    ));
                };
                session.establish(user.clone(), Some(&tokens));
                info!(email = %credentials.email, "logged in");
                Ok(AuthSuccess {
                    message: "Login successful!".to_string(),
                    user,
                    tokens: Some(tokens),
                })
            }
            Err(e) => {
                error!(error = %e, "login request failed");
                Err(match &e {
                    ApiError::Status { data, message, .. } => AuthFailure::general(
                        data.pointer("/error/message")
                            .and_then(Value::as_str)
                            .unwrap_or(if message.is_empty() { "Login failed" } else { message.as_str() }),
                    ),
                    _ => AuthFailure::general("Could not reach the server"),
                })
            }
        }
    }

    /// Without a stored token the local session is simply dropped. A server
    /// refusal keeps the session; an unreachable server clears it anyway.
    pub async fn logout(&self, session: &mut Session) -> AuthOutcome {
        let Some(token) = session.access_token() else {
            warn!("no access token, clearing local session");
            session.clear();
            return Ok(logged_out());
        };

        match self.api.post_authorized("auth/logout", &json!({}), &token).await {
            Ok(_) => {
                session.clear();
                info!("logged out");
                Ok(logged_out())
            }
            Err(ApiError::Status { data, message, .. }) => Err(AuthFailure::general(
                data.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or(if message.is_empty() {
                        "Logout failed".to_string()
                    } else {
                        message
                    }),
            )),
            Err(e) => {
                error!(error = %e, "logout request failed, clearing local session");
                session.clear();
                Err(AuthFailure::general("Could not reach the server"))
            }
        }
    }
}

fn logged_out() -> AuthSuccess {
    AuthSuccess {
        message: "Logged out successfully!".to_string(),
        user: None,
        tokens: None,
    }
}

fn message_of(resp: &Value) -> Option<&str> {
    resp.get("message").and_then(Value::as_str)
}

fn credentials_of(resp: &Value) -> (Option<User>, Option<Tokens>) {
    let user = resp
        .get("user")
        .filter(|u| u.is_object())
        .and_then(|u| serde_json::from_value::<User>(u.clone()).ok());
    let tokens = resp
        .get("access_token")
        .and_then(Value::as_str)
        .map(|access| Tokens {
            access_token: access.to_string(),
            refresh_token: resp.get("refresh_token").and_then(Value::as_str).map(str::to_string),
            token_type: resp.get("token_type").and_then(Value::as_str).map(str::to_string),
        });
    (user, tokens)
}

/// Validation details first, then business error codes, then whatever message
/// the payload carries.
fn signup_failure(err: &ApiError) -> AuthFailure {
    let ApiError::Status { data, message, .. } = err else {
        error!(error = %err, "sign up request failed");
        return AuthFailure::general("Could not reach the server");
    };

    if let Some(detail) = data.pointer("/error/details/0") {
        return AuthFailure {
            field: Some(FormField::from_name(
                detail.get("field").and_then(Value::as_str).unwrap_or(""),
            )),
            message: message_of(detail).unwrap_or("Invalid input").to_string(),
        };
    }

    if let Some(business) = data.get("error").filter(|e| e.is_object()) {
        return AuthFailure {
            field: Some(FormField::from_code(
                business.get("code").and_then(Value::as_str).unwrap_or(""),
            )),
            message: message_of(business).unwrap_or("Sign up failed").to_string(),
        };
    }

    AuthFailure::general(if message.is_empty() {
        "Sign up failed"
    } else {
        message.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(data: Value) -> ApiError {
        ApiError::Status {
            status: 400,
            status_text: "Bad Request".into(),
            message: "Bad Request".into(),
            data,
        }
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let err = Credentials::new("  ", "secret").validate().unwrap_err();
        assert_eq!(err.field, Some(FormField::Email));
        assert_eq!(err.message, "Please enter email");

        let err = Credentials::new("a@b.c", "").validate().unwrap_err();
        assert_eq!(err.field, Some(FormField::Password));

        assert!(Credentials::new("a@b.c", "pw").validate().is_ok());
    }

    #[test]
    fn test_signup_failure_from_details() {
        let err = status(json!({ "error": { "details": [
            { "field": "password", "message": "Password must be at least 8 characters" }
        ] } }));
        let failure = signup_failure(&err);
        assert_eq!(failure.field, Some(FormField::Password));
        assert_eq!(failure.message, "Password must be at least 8 characters");
    }

    #[test]
    fn test_signup_failure_from_business_code() {
        let failure = signup_failure(&status(json!({ "error": {
            "code": "EMAIL_EXISTS", "message": "Email already exists"
        } })));
        assert_eq!(failure.field, Some(FormField::Email));
        assert_eq!(failure.message, "Email already exists");

        let failure = signup_failure(&status(json!({ "error": {
            "code": "RATE_LIMITED", "message": "Slow down"
        } })));
        assert_eq!(failure.field, Some(FormField::General));
    }

    #[test]
    fn test_signup_failure_generic_message() {
        let failure = signup_failure(&status(json!({ "message": "Nope" })));
        assert_eq!(failure.field, None);
        assert_eq!(failure.message, "Bad Request");
    }

    #[test]
    fn test_credentials_of_reads_tokens_and_user() {
        let (user, tokens) = credentials_of(&json!({
            "user": { "id": 1, "email": "a@b.c" },
            "access_token": "acc",
            "token_type": "Bearer"
        }));
        assert_eq!(user.unwrap().email, "a@b.c");
        let tokens = tokens.unwrap();
        assert_eq!(tokens.access_token, "acc");
        assert_eq!(tokens.refresh_token, None);
        assert_eq!(tokens.token_type.as_deref(), Some("Bearer"));

        let (user, tokens) = credentials_of(&json!({ "message": "hi" }));
        assert!(user.is_none() && tokens.is_none());
    }

    #[tokio::test]
    async fn test_logout_without_token_clears_locally() {
        use crate::session::MemorySessionStore;
        let service = AuthService::new(ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:9/"));
        let mut session = Session::new(Box::new(MemorySessionStore::new()));
        let outcome = service.logout(&mut session).await.unwrap();
        assert_eq!(outcome.message, "Logged out successfully!");
        assert!(!session.is_authenticated());
    }
}
