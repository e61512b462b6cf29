use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::{AuthError, Claims, TokenKind, UserRole, UserSession};

/// Issues and validates HS256 access/refresh tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: Duration,
    refresh_token_expires_in: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .field("access_token_expires_in", &self.access_token_expires_in)
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .finish()
    }
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: Duration::minutes(15),
            refresh_token_expires_in: Duration::days(30),
        }
    }

    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        kind: TokenKind,
    ) -> Result<String, AuthError> {
        let lifetime = match kind {
            TokenKind::Access => self.access_token_expires_in,
            TokenKind::Refresh => self.refresh_token_expires_in,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            exp: (now + lifetime).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            token_type: kind,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    pub fn create_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, AuthError> {
        self.issue(user_id, email, role, TokenKind::Access)
    }

    pub fn create_refresh_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, AuthError> {
        self.issue(user_id, email, role, TokenKind::Refresh)
    }

    /// Create token pair (access + refresh)
    pub fn create_token_pair(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<(String, String), AuthError> {
        let access_token = self.create_access_token(user_id, email, role.clone())?;
        let refresh_token = self.create_refresh_token(user_id, email, role)?;
        Ok((access_token, refresh_token))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Validate a token and require it to be of the given kind
    pub fn validate_token_of_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != kind {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Session for an access token; refresh tokens are rejected
    pub fn extract_user_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let claims = self.validate_token_of_kind(token, TokenKind::Access)?;
        UserSession::from_claims(&claims).map_err(|_| AuthError::InvalidToken)
    }

    pub fn access_token_expires_in_seconds(&self) -> usize {
        self.access_token_expires_in.num_seconds() as usize
    }
}

/// Extract bearer token from authorization header
pub fn extract_bearer_token(auth_header: &str) -> Result<&str, AuthError> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeaderFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_creation_and_validation() {
        let jwt_service = JwtService::new("test_secret");
        let user_id = Uuid::new_v4();

        let token = jwt_service
            .create_access_token(user_id, "member@example.com", UserRole::Member)
            .unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "member@example.com");
        assert_eq!(claims.role, UserRole::Member);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtService::new("secret-a");
        let verifier = JwtService::new("secret-b");
        let token = issuer
            .create_access_token(Uuid::new_v4(), "a@example.com", UserRole::Admin)
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc").unwrap(), "abc");
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_token_pair_has_distinct_ids() {
        let jwt_service = JwtService::new("test_secret");
        let (access, refresh) = jwt_service
            .create_token_pair(Uuid::new_v4(), "coach@example.com", UserRole::Coach)
            .unwrap();

        let access_claims = jwt_service.validate_token(&access).unwrap();
        let refresh_claims = jwt_service.validate_token(&refresh).unwrap();
        assert_ne!(access_claims.jti, refresh_claims.jti);
        assert!(refresh_claims.exp > access_claims.exp);

        let session = jwt_service.extract_user_session(&access).unwrap();
        assert_eq!(session.role, UserRole::Coach);
        assert_eq!(access_claims.token_type, TokenKind::Access);
        assert_eq!(refresh_claims.token_type, TokenKind::Refresh);
    }

    #[test]
    fn test_refresh_token_is_not_a_session() {
        let jwt_service = JwtService::new("test_secret");
        let (access, refresh) = jwt_service
            .create_token_pair(Uuid::new_v4(), "member@example.com", UserRole::Member)
            .unwrap();

        assert!(matches!(
            jwt_service.extract_user_session(&refresh),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            jwt_service.validate_token_of_kind(&access, TokenKind::Refresh),
            Err(AuthError::InvalidToken)
        ));
        assert!(jwt_service
            .validate_token_of_kind(&refresh, TokenKind::Refresh)
            .is_ok());
    }
}
