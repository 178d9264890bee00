//! Data access layer.
//!
//! Handlers only see the traits below. The MySQL backend is used in
//! production; the in-memory backend backs the test suite and local demos.

pub mod memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;
use derive_more::Display;
use tracing::info;

use crate::{
    config::{Config, StoreBackend},
    db::init_db,
    model::{
        employee::Employee,
        leave::{Leave, NewLeave},
        project::Project,
        user::User,
    },
};

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;

/// Error kinds the data access layer reports back to handlers.
///
/// `NotFound` and `Forbidden` carry a caller-facing message that is passed
/// through unchanged.
#[derive(Debug, Display, PartialEq, Eq)]
pub enum RepoError {
    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "Database error: {}", _0)]
    Database(String),
}

impl std::error::Error for RepoError {}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl RepoError {
    pub fn employee_not_found(employee_id: u64) -> Self {
        RepoError::NotFound(format!("Employee {} not found", employee_id))
    }

    pub fn leave_not_found(leave_id: u64) -> Self {
        RepoError::NotFound(format!("Leave {} not found", leave_id))
    }

    pub fn leave_not_owned(leave_id: u64, employee_id: u64) -> Self {
        RepoError::Forbidden(format!(
            "Leave {} does not belong to employee {}",
            leave_id, employee_id
        ))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find_employee(&self, employee_id: u64) -> RepoResult<Employee>;

    /// Leaves of one employee, ascending by id.
    async fn find_leaves(&self, employee_id: u64) -> RepoResult<Vec<Leave>>;

    /// Appends leaves for the employee and returns them with their new ids.
    async fn add_leaves(
        &self,
        employee_id: u64,
        leaves: Vec<NewLeave>,
    ) -> RepoResult<Vec<Leave>>;

    /// Replaces existing leaves by id. Every leave must exist and belong to
    /// `employee_id`; otherwise nothing is written.
    async fn update_leaves(&self, employee_id: u64, leaves: Vec<Leave>) -> RepoResult<()>;

    /// Removes leaves by id with the same all-or-nothing ownership check as
    /// `update_leaves`.
    async fn delete_leaves(&self, employee_id: u64, leave_ids: &[u64]) -> RepoResult<()>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self) -> RepoResult<Vec<Project>>;
    async fn find_project(&self, project_id: u64) -> RepoResult<Project>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_user(&self, username: &str) -> RepoResult<Option<User>>;

    /// Records a refresh token expiring at `expires_at` (unix seconds).
    /// Revoked and expired tokens may be pruned along the way.
    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> RepoResult<()>;

    /// Revokes an active refresh token and returns its owner.
    /// `None` when the token is unknown or already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<Option<u64>>;
}

/// The collaborators handed to the HTTP layer.
#[derive(Clone)]
pub struct Stores {
    pub employees: Arc<dyn EmployeeStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub accounts: Arc<dyn AccountStore>,
}

impl Stores {
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: EmployeeStore + ProjectStore + AccountStore + 'static,
    {
        Self {
            employees: store.clone(),
            projects: store.clone(),
            accounts: store,
        }
    }

    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match config.store_backend {
            StoreBackend::MySql => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL must be set for the mysql backend")
                })?;
                let pool = init_db(database_url, config.db_max_connections).await?;

                if config.run_migrations {
                    sqlx::migrate!("./migrations").run(&pool).await?;
                    info!("Database migrations applied");
                }

                Ok(Self::from_shared(Arc::new(MySqlStore::new(pool))))
            }
            StoreBackend::Memory => {
                let store = match &config.seed_file {
                    Some(path) => InMemoryStore::from_seed_file(path)?,
                    None => InMemoryStore::default(),
                };
                info!("Using in-memory store");
                Ok(Self::from_shared(Arc::new(store)))
            }
        }
    }
}
