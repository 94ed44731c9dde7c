//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::user::{Role, User};

fn user_from_row(row: &PgRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::from_db(&role),
    }
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with the `user` role
    ///
    /// Registration never produces an admin; there is no self-promotion
    /// path.
    pub async fn create(&self, username: &str, email: &str, password: &str) -> Result<User> {
        info!("Creating new user: {}", username);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, 'user')
            RETURNING id, username, email, password_hash, role
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// List every user
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Verify a user's password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{JwtConfig, JwtService};
    use crate::repositories::test_support::{test_pool, unique_suffix};

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn create_hashes_password_and_defaults_to_user_role() {
        let repo = UserRepository::new(test_pool().await);
        let suffix = unique_suffix();
        let username = format!("alice_{suffix}");

        let user = repo
            .create(&username, &format!("{username}@example.com"), "hunter2abc")
            .await
            .expect("create user");

        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "hunter2abc");

        let found = repo
            .find_by_username(&username)
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(found.id, user.id);

        assert!(repo.verify_password(&found, "hunter2abc").expect("verify"));
        assert!(!repo.verify_password(&found, "wrong").expect("verify"));
    }

    // Registration through to an authenticated lookup: create the user,
    // check the password as login does, issue a token, and resolve its
    // subject back to the same account.
    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn registered_user_can_log_in_and_be_resolved_from_token() {
        let repo = UserRepository::new(test_pool().await);
        let suffix = unique_suffix();
        let username = format!("alice_{suffix}");

        let registered = repo
            .create(&username, &format!("{username}@example.com"), "hunter2abc")
            .await
            .expect("create user");

        let candidate = repo
            .find_by_username(&username)
            .await
            .expect("lookup")
            .expect("user exists");
        assert!(repo.verify_password(&candidate, "hunter2abc").expect("verify"));

        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 1800,
        });
        let token = jwt.issue(&candidate.username).expect("issue");
        let claims = jwt.verify(&token).expect("verify token");

        let me = repo
            .find_by_username(&claims.sub)
            .await
            .expect("lookup")
            .expect("subject resolves");
        assert_eq!(me.id, registered.id);
        assert_eq!(me.username, username);
        assert_eq!(me.role, Role::User);
    }
}
