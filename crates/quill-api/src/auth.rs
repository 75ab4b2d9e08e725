use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use quill_core::UserId;
use serde::Deserialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Verifies HS256 access tokens issued by the auth service.
#[derive(Clone)]
pub struct AccessTokenVerifier {
    config: Arc<AppConfig>,
    key: DecodingKey,
}

impl AccessTokenVerifier {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            config,
        }
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = self.config.auth_clock_skew.as_secs();
        if let Some(issuer) = self.config.jwt_issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }

        let decoded = decode::<AccessClaims>(token, &self.key, &validation).map_err(|error| {
            AppError::unauthorized(format!("Token validation failed: {}", sanitize(&error)))
        })?;

        if let Some(expected) = self.config.jwt_audience.as_deref() {
            if !audience_matches(decoded.claims.aud.as_ref(), expected) {
                return Err(AppError::unauthorized("Token audience is not allowed"));
            }
        }
        validate_temporal_claims(&decoded.claims, self.config.auth_clock_skew)?;

        let user_id = decoded
            .claims
            .sub
            .or(decoded.claims.id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::unauthorized("Token subject is missing"))?;

        Ok(AuthenticatedUser {
            user_id: UserId::new(user_id),
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: Option<String>,
    /// Older tokens carry the user id here instead of `sub`
    id: Option<String>,
    aud: Option<Value>,
    exp: Option<i64>,
    iat: Option<i64>,
    nbf: Option<i64>,
}

fn validate_temporal_claims(
    claims: &AccessClaims,
    clock_skew: std::time::Duration,
) -> Result<(), AppError> {
    let now = chrono::Utc::now().timestamp();
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(0);

    let exp = claims
        .exp
        .ok_or_else(|| AppError::unauthorized("Token missing `exp` claim"))?;
    if exp <= now.saturating_sub(skew) {
        return Err(AppError::unauthorized("Token is expired"));
    }

    if let Some(iat) = claims.iat {
        if iat > now.saturating_add(skew) {
            return Err(AppError::unauthorized("Token `iat` is in the future"));
        }
    }

    if let Some(nbf) = claims.nbf {
        if nbf > now.saturating_add(skew) {
            return Err(AppError::unauthorized("Token is not yet valid"));
        }
    }

    Ok(())
}

fn audience_matches(aud: Option<&Value>, expected: &str) -> bool {
    let Some(aud) = aud else {
        return false;
    };

    match aud {
        Value::String(value) => value == expected,
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .any(|value| value == expected),
        _ => false,
    }
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, claims: &serde_json::Value) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::config::test_config;

    fn verifier(config: crate::config::AppConfig) -> AccessTokenVerifier {
        AccessTokenVerifier::new(Arc::new(config))
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn bearer_token_extractor_rejects_missing_header() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn verifies_valid_token() {
        let config = test_config();
        let token = issue_test_token(
            &config.jwt_secret,
            &json!({ "sub": "user-42", "iat": now(), "exp": now() + 600 }),
        );

        let user = verifier(config).verify_access_token(&token).unwrap();
        assert_eq!(user.user_id, UserId::new("user-42"));
    }

    #[test]
    fn falls_back_to_id_claim() {
        let config = test_config();
        let token = issue_test_token(
            &config.jwt_secret,
            &json!({ "id": "legacy-user", "exp": now() + 600 }),
        );

        let user = verifier(config).verify_access_token(&token).unwrap();
        assert_eq!(user.user_id, UserId::new("legacy-user"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let config = test_config();
        let token = issue_test_token(
            "another-secret-that-is-also-long-enough",
            &json!({ "sub": "user-42", "exp": now() + 600 }),
        );

        let err = verifier(config).verify_access_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let config = test_config();
        let token = issue_test_token(
            &config.jwt_secret,
            &json!({ "sub": "user-42", "exp": now() - 3_600 }),
        );

        assert!(verifier(config).verify_access_token(&token).is_err());
    }

    #[test]
    fn rejects_blank_subject() {
        let config = test_config();
        let token = issue_test_token(
            &config.jwt_secret,
            &json!({ "sub": "  ", "exp": now() + 600 }),
        );

        let err = verifier(config).verify_access_token(&token).unwrap_err();
        assert!(err.to_string().contains("subject"));
    }

    #[test]
    fn checks_configured_audience() {
        let mut config = test_config();
        config.jwt_audience = Some("quill".to_string());
        let token = issue_test_token(
            &config.jwt_secret,
            &json!({ "sub": "user-42", "aud": "other", "exp": now() + 600 }),
        );

        let err = verifier(config).verify_access_token(&token).unwrap_err();
        assert!(err.to_string().contains("audience"));
    }

    #[test]
    fn audience_matches_string_or_array() {
        assert!(audience_matches(
            Some(&Value::String("quill".to_string())),
            "quill"
        ));
        assert!(audience_matches(
            Some(&json!(["web", "quill"])),
            "quill"
        ));
        assert!(!audience_matches(None, "quill"));
    }

    #[test]
    fn temporal_claims_reject_future_iat() {
        let claims = AccessClaims {
            sub: Some("user".to_string()),
            id: None,
            aud: None,
            exp: Some(now() + 300),
            iat: Some(now() + 120),
            nbf: None,
        };
        let err =
            validate_temporal_claims(&claims, std::time::Duration::from_secs(30)).unwrap_err();
        assert!(err.to_string().contains("future"));
    }
}
