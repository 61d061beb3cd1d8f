use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use shared_models::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const CALL_ID_HEADER: &str = "X-Call-Id";

/// Clinic owner and call a tool request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    pub user_id: Uuid,
    pub call_id: String,
}

/// Call id only, for lookups that happen before the clinic is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallId(pub String);

/// Parse a clinic owner id, accepting any UUID spelling and rejecting the rest.
pub fn validate_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid user_id format: {}. Error: {}", raw, e)))
}

fn header_value(parts: &Parts, name: &str) -> Result<String, AppError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", name)))?;

    let value = value
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} header", name)))?
        .trim();

    if value.is_empty() {
        return Err(AppError::BadRequest(format!("Missing {} header", name)));
    }

    Ok(value.to_string())
}

impl<S> FromRequestParts<S> for CallIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = validate_user_id(&header_value(parts, USER_ID_HEADER)?)?;
        let call_id = header_value(parts, CALL_ID_HEADER)?;

        Ok(CallIdentity { user_id, call_id })
    }
}

impl<S> FromRequestParts<S> for CallId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CallId(header_value(parts, CALL_ID_HEADER)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(identity: CallIdentity) -> String {
        format!("{}/{}", identity.user_id, identity.call_id)
    }

    fn app() -> Router {
        Router::new().route("/whoami", post(whoami))
    }

    #[tokio::test]
    async fn test_identity_headers_are_extracted() {
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .method("POST")
            .uri("/whoami")
            .header(USER_ID_HEADER, user_id.to_string())
            .header(CALL_ID_HEADER, "call-42")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), format!("{}/call-42", user_id));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_user_id_is_bad_request() {
        let missing = Request::builder()
            .method("POST")
            .uri("/whoami")
            .header(CALL_ID_HEADER, "call-42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app().oneshot(missing).await.unwrap().status(), StatusCode::BAD_REQUEST);

        let invalid = Request::builder()
            .method("POST")
            .uri("/whoami")
            .header(USER_ID_HEADER, "not-a-uuid")
            .header(CALL_ID_HEADER, "call-42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app().oneshot(invalid).await.unwrap().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validate_user_id_normalises_case() {
        let id = validate_user_id("123E4567-E89B-12D3-A456-426614174000").unwrap();
        assert_eq!(id.to_string(), "123e4567-e89b-12d3-a456-426614174000");
        assert!(validate_user_id("123").is_err());
    }
}
