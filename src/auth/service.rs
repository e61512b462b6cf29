use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{
    AuthError, AuthResponse, JwtService, LoginContext, LoginRequest, MessageResponse,
    RefreshTokenRequest, RegisterRequest, TokenKind, TokenResponse, UserInfo, UserRole, UserSession,
};
use crate::models::validation::validate_email;
use crate::services::LoginLogService;

/// Credentials row used for authentication
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    login_logs: LoginLogService,
    db: PgPool,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_secret: &str) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret),
            login_logs: LoginLogService::new(db.clone()),
            db,
        }
    }

    /// Register a new member. Creates the credentials, the role and an empty profile.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        validate_email(&email).map_err(|e| AuthError::EmailValidation(e.to_string()))?;

        if self.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AuthError::PasswordValidation(e.to_string()))?;
        let role = UserRole::Member;
        let now = chrono::Utc::now();

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING id, email, password_hash, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO profiles (user_id, display_name) VALUES ($1, $2)")
            .bind(user.id)
            .bind(request.full_name.as_deref().map(str::trim))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Registered new member");
        self.issue_session(user, role).await
    }

    /// Login user. Every attempt is written to the login log.
    pub async fn login(
        &self,
        request: LoginRequest,
        context: LoginContext,
    ) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();

        let user = match self.get_user_by_email(&email).await? {
            Some(user) if verify_password(&request.password, &user.password_hash)? => user,
            maybe_user => {
                self.record_login(maybe_user.map(|u| u.id), &email, false, &context)
                    .await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.record_login(Some(user.id), &email, true, &context).await;

        let role = self.get_user_role(user.id).await?.unwrap_or(UserRole::Member);
        self.issue_session(user, role).await
    }

    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> Result<TokenResponse, AuthError> {
        let claims = self
            .jwt_service
            .validate_token_of_kind(&request.refresh_token, TokenKind::Refresh)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        if !self.is_refresh_token_valid(user_id, &request.refresh_token).await? {
            return Err(AuthError::InvalidToken);
        }

        // The role may have changed since the refresh token was issued
        let role = self.get_user_role(user_id).await?.unwrap_or(claims.role);
        let access_token = self
            .jwt_service
            .create_access_token(user_id, &claims.email, role)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
        })
    }

    /// Blacklist the access token and revoke every refresh token of the user
    pub async fn logout(&self, token: &str) -> Result<MessageResponse, AuthError> {
        let claims = self.jwt_service.validate_token_of_kind(token, TokenKind::Access)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        self.blacklist_token(&claims.jti, claims.exp as i64).await?;
        self.revoke_user_refresh_tokens(user_id).await?;

        Ok(MessageResponse {
            message: "Successfully logged out".to_string(),
        })
    }

    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        if self.is_token_blacklisted(&session.jti).await? {
            return Err(AuthError::InvalidToken);
        }

        Ok(session)
    }

    pub async fn user_info(&self, user_id: Uuid) -> Result<UserInfo, AuthError> {
        let row = sqlx::query(
            "SELECT u.id, u.email, u.created_at, u.updated_at, COALESCE(r.role, 'member') AS role
             FROM users u LEFT JOIN user_roles r ON r.user_id = u.id
             WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::InvalidToken)?;

        let role: String = row.get("role");
        Ok(UserInfo {
            id: row.get("id"),
            email: row.get("email"),
            role: UserRole::parse(&role).unwrap_or(UserRole::Member),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// Create or replace the role of a user
    pub async fn set_user_role(&self, user_id: Uuid, role: &UserRole) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET role = $2, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn issue_session(&self, user: User, role: UserRole) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) = self
            .jwt_service
            .create_token_pair(user.id, &user.email, role.clone())?;

        self.store_refresh_token(user.id, &refresh_token).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: UserInfo {
                id: user.id,
                email: user.email,
                role,
                created_at: user.created_at,
                updated_at: user.updated_at,
            },
        })
    }

    async fn record_login(&self, user_id: Option<Uuid>, email: &str, success: bool, context: &LoginContext) {
        // A failing log write must not block the login itself
        if let Err(e) = self
            .login_logs
            .record(
                user_id,
                email,
                success,
                context.ip_address.as_deref(),
                context.user_agent.as_deref(),
            )
            .await
        {
            tracing::warn!("Failed to write login log for {}: {}", email, e);
        }
    }

    async fn get_user_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AuthError> {
        let result = sqlx::query("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.and_then(|row| {
            let role_str: String = row.get("role");
            UserRole::parse(&role_str)
        }))
    }

    async fn store_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.jwt_service.validate_token(refresh_token)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp as i64, 0)
            .ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(format!("{:x}", md5::compute(refresh_token)))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn is_refresh_token_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        let token_hash = format!("{:x}", md5::compute(refresh_token));

        let result = sqlx::query(
            "SELECT 1 FROM refresh_tokens
             WHERE user_id = $1 AND token_hash = $2 AND expires_at > NOW() AND NOT revoked",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(result.is_some())
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()")
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;

        Ok(result.is_some())
    }

    async fn blacklist_token(&self, jti: &str, exp: i64) -> Result<(), AuthError> {
        let expires_at = chrono::DateTime::from_timestamp(exp, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
