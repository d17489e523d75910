use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::{Claims, RefreshClaims},
    user::{LoginResponse, Role, User},
};

const USER_COLS: &str =
    "id, email, password_hash, display_name, role, is_super_admin,
     department, responsible_classes, is_active, created_at, updated_at";

pub struct AuthService;

impl AuthService {
    /// Create an account with role `pending`. If any student rows carry this
    /// email as an unclaimed parent contact, link them to the new account.
    pub async fn signup(
        pool: &PgPool,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> anyhow::Result<User> {
        anyhow::ensure!(email.contains('@'), "Invalid email address");
        anyhow::ensure!(password.len() >= 8, "Password must be at least 8 characters");
        anyhow::ensure!(!display_name.trim().is_empty(), "Display name is required");

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        anyhow::ensure!(existing.is_none(), "An account with this email already exists");

        let password_hash = bcrypt::hash(password, 12)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, display_name, role)
             VALUES ($1, $2, $3, 'pending')
             RETURNING {USER_COLS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(display_name.trim())
        .fetch_one(pool)
        .await?;

        // Onboarding auto-match: claim any students pre-registered with this
        // parent email but not yet linked to an account.
        let linked = sqlx::query(
            "UPDATE students
             SET primary_parent_id = $1, updated_at = NOW()
             WHERE parent_email = $2 AND primary_parent_id IS NULL",
        )
        .bind(user.id)
        .bind(email)
        .execute(pool)
        .await?;
        if linked.rows_affected() > 0 {
            tracing::info!(
                "auto-linked {} student(s) to new account {}",
                linked.rows_affected(),
                user.id
            );
        }

        Ok(user)
    }

    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        refresh_secret: &str,
        access_ttl: u64,
        refresh_ttl_days: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE email = $1 AND is_active = TRUE"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Invalid credentials"))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid credentials"))?;
        if !valid {
            anyhow::bail!("Invalid credentials");
        }

        let role: Role = user.role.parse().unwrap_or(Role::Pending);
        let access_token =
            Self::generate_access_token(&user, role, jwt_secret, access_ttl)?;
        let (refresh_token_str, refresh_id) =
            Self::generate_refresh_token(&user.id, refresh_secret, refresh_ttl_days)?;

        let hash = bcrypt::hash(&refresh_token_str, 8)?;
        let expires_at = Utc::now() + chrono::Duration::days(refresh_ttl_days as i64);
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(refresh_id)
        .bind(user.id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(LoginResponse {
            access_token,
            refresh_token: refresh_token_str,
            user: user.into(),
        })
    }

    /// Exchange a valid refresh token for a new access token.
    pub async fn refresh(
        pool: &PgPool,
        refresh_token: &str,
        jwt_secret: &str,
        refresh_secret: &str,
        access_ttl: u64,
    ) -> anyhow::Result<String> {
        let claims = Self::decode_refresh_token(refresh_token, refresh_secret)?;
        let token_id: Uuid = claims.jti.parse()?;
        let user_id: Uuid = claims.sub.parse()?;

        let row: Option<(String, bool)> = sqlx::query_as(
            "SELECT token_hash, revoked FROM refresh_tokens
             WHERE id = $1 AND user_id = $2 AND expires_at > NOW()",
        )
        .bind(token_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let (token_hash, revoked) =
            row.ok_or_else(|| anyhow::anyhow!("Refresh token not found or expired"))?;
        anyhow::ensure!(!revoked, "Refresh token revoked");
        anyhow::ensure!(
            bcrypt::verify(refresh_token, &token_hash).unwrap_or(false),
            "Refresh token mismatch"
        );

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Account not found or deactivated"))?;

        let role: Role = user.role.parse().unwrap_or(Role::Pending);
        Self::generate_access_token(&user, role, jwt_secret, access_ttl)
    }

    /// Revoke all refresh tokens for a user (logout everywhere).
    pub async fn logout(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            new_password.len() >= 8,
            "Password must be at least 8 characters"
        );

        let hash: String =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(user_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Account not found"))?;

        anyhow::ensure!(
            bcrypt::verify(current_password, &hash).unwrap_or(false),
            "Current password is incorrect"
        );

        let new_hash = bcrypt::hash(new_password, 12)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> anyhow::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Account not found"))
    }

    fn generate_access_token(
        user: &User,
        role: Role,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            role,
            super_admin: user.is_super_admin,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn generate_refresh_token(
        user_id: &Uuid,
        secret: &str,
        ttl_days: u64,
    ) -> anyhow::Result<(String, Uuid)> {
        let refresh_id = Uuid::new_v4();
        let now = Utc::now().timestamp() as usize;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: refresh_id.to_string(),
            iat: now,
            exp: now + (ttl_days as usize) * 24 * 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok((token, refresh_id))
    }

    fn decode_refresh_token(token: &str, secret: &str) -> anyhow::Result<RefreshClaims> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<RefreshClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}
