use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, MySqlConnection, MySqlPool};
use tracing::{debug, error};

use super::{AccountStore, EmployeeStore, ProjectStore, RepoError, RepoResult};
use crate::model::{
    employee::{Employee, EmployeeRecord},
    leave::{Leave, LeaveStatus, LeaveType, NewLeave},
    project::Project,
    user::User,
};

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: String,
    status: String,
}

impl TryFrom<LeaveRow> for Leave {
    type Error = RepoError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let leave_type = LeaveType::from_str(&row.leave_type).map_err(|_| {
            RepoError::Database(format!("leave {} has unknown type '{}'", row.id, row.leave_type))
        })?;
        let status = LeaveStatus::from_str(&row.status).map_err(|_| {
            RepoError::Database(format!("leave {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(Leave {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            leave_type,
            status,
        })
    }
}

async fn ensure_employee(conn: &mut MySqlConnection, employee_id: u64) -> RepoResult<()> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;

    if count == 0 {
        return Err(RepoError::employee_not_found(employee_id));
    }
    Ok(())
}

/// Locks the leave row for the rest of the transaction and checks its owner.
async fn ensure_owned(
    conn: &mut MySqlConnection,
    employee_id: u64,
    leave_id: u64,
) -> RepoResult<()> {
    let owner =
        sqlx::query_scalar::<_, u64>("SELECT employee_id FROM leaves WHERE id = ? FOR UPDATE")
            .bind(leave_id)
            .fetch_optional(&mut *conn)
            .await?;

    match owner {
        None => Err(RepoError::leave_not_found(leave_id)),
        Some(owner) if owner != employee_id => {
            Err(RepoError::leave_not_owned(leave_id, employee_id))
        }
        Some(_) => Ok(()),
    }
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn find_employee(&self, employee_id: u64) -> RepoResult<Employee> {
        let record = sqlx::query_as::<_, EmployeeRecord>(
            r#"
            SELECT id, first_name, second_name, mail, max_role
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::employee_not_found(employee_id))?;

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name
            FROM projects p
            JOIN employee_projects ep ON ep.project_id = p.id
            WHERE ep.employee_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Employee::from_record(record, projects))
    }

    async fn find_leaves(&self, employee_id: u64) -> RepoResult<Vec<Leave>> {
        let mut conn = self.pool.acquire().await?;
        ensure_employee(&mut conn, employee_id).await?;

        let rows = sqlx::query_as::<_, LeaveRow>(
            r#"
            SELECT id, employee_id, start_date, end_date, leave_type, status
            FROM leaves
            WHERE employee_id = ?
            ORDER BY id
            "#,
        )
        .bind(employee_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(Leave::try_from).collect()
    }

    async fn add_leaves(
        &self,
        employee_id: u64,
        leaves: Vec<NewLeave>,
    ) -> RepoResult<Vec<Leave>> {
        let mut tx = self.pool.begin().await?;
        ensure_employee(&mut tx, employee_id).await?;

        let mut added = Vec::with_capacity(leaves.len());
        for new_leave in leaves {
            let result = sqlx::query(
                r#"
                INSERT INTO leaves (employee_id, start_date, end_date, leave_type, status)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(employee_id)
            .bind(new_leave.start_date)
            .bind(new_leave.end_date)
            .bind(new_leave.leave_type.to_string())
            .bind(new_leave.status.to_string())
            .execute(&mut *tx)
            .await?;

            added.push(new_leave.into_leave(result.last_insert_id(), employee_id));
        }

        tx.commit().await?;
        debug!(employee_id, count = added.len(), "Inserted leaves");
        Ok(added)
    }

    async fn update_leaves(&self, employee_id: u64, leaves: Vec<Leave>) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        ensure_employee(&mut tx, employee_id).await?;

        for leave in &leaves {
            ensure_owned(&mut tx, employee_id, leave.id).await?;
        }

        for leave in &leaves {
            sqlx::query(
                r#"
                UPDATE leaves
                SET start_date = ?, end_date = ?, leave_type = ?, status = ?
                WHERE id = ? AND employee_id = ?
                "#,
            )
            .bind(leave.start_date)
            .bind(leave.end_date)
            .bind(leave.leave_type.to_string())
            .bind(leave.status.to_string())
            .bind(leave.id)
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(employee_id, count = leaves.len(), "Updated leaves");
        Ok(())
    }

    async fn delete_leaves(&self, employee_id: u64, leave_ids: &[u64]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        ensure_employee(&mut tx, employee_id).await?;

        for &leave_id in leave_ids {
            ensure_owned(&mut tx, employee_id, leave_id).await?;
        }

        for &leave_id in leave_ids {
            sqlx::query("DELETE FROM leaves WHERE id = ? AND employee_id = ?")
                .bind(leave_id)
                .bind(employee_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(employee_id, count = leave_ids.len(), "Deleted leaves");
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MySqlStore {
    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        Ok(sqlx::query_as::<_, Project>("SELECT id, name FROM projects ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_project(&self, project_id: u64) -> RepoResult<Project> {
        sqlx::query_as::<_, Project>("SELECT id, name FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Project {} not found", project_id)))
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn find_user(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password, role_id, employee_id
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        // non-fatal
        if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            error!(error = %e, user_id, "Failed to update last_login_at");
        }

        // revoked or expired tokens of this user can never be presented again
        if let Err(e) = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = ? AND (revoked = TRUE OR expires_at < NOW())
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        {
            error!(error = %e, user_id, "Failed to prune refresh tokens");
        }

        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, (u64, bool)>(
            "SELECT user_id, revoked FROM refresh_tokens WHERE jti = ? FOR UPDATE",
        )
        .bind(jti)
        .fetch_optional(&mut *tx)
        .await?;

        let user_id = match record {
            Some((user_id, false)) => user_id,
            _ => return Ok(None),
        };

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user_id))
    }
}
