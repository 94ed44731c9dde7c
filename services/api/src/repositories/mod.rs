//! Repositories for database operations

pub mod chat;
pub mod task;
pub mod user;

pub use chat::ChatRepository;
pub use task::TaskRepository;
pub use user::UserRepository;

/// Check whether an error chain bottoms out in a Postgres unique
/// violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

#[cfg(test)]
pub(crate) mod test_support {
    use common::database::{DatabaseConfig, init_pool, init_schema};
    use sqlx::PgPool;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Connect to the database named by `DATABASE_URL` and make sure the
    /// schema exists. Tests using this are `#[ignore]`d by default and
    /// need a running PostgreSQL.
    pub async fn test_pool() -> PgPool {
        let config = DatabaseConfig::from_env().expect("database config");
        let pool = init_pool(&config).await.expect("connect to test database");
        init_schema(&pool).await.expect("create schema");
        pool
    }

    /// Process-unique suffix so repeated test runs do not collide on
    /// unique columns
    pub fn unique_suffix() -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}", std::process::id(), n)
    }
}
