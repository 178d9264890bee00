use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{AccountStore, EmployeeStore, ProjectStore, RepoError, RepoResult};
use crate::{
    auth::password::{hash_password, is_password_hash},
    model::{
        employee::{Employee, EmployeeRecord},
        leave::{Leave, NewLeave},
        project::Project,
        user::User,
    },
};

/// Employee entry of a seed file, with project assignments by id.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEmployee {
    #[serde(flatten)]
    pub record: EmployeeRecord,
    #[serde(default)]
    pub project_ids: Vec<u64>,
}

/// Initial contents for an [`InMemoryStore`], usually read from `SEED_FILE`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub employees: Vec<SeedEmployee>,
    pub projects: Vec<Project>,
    pub leaves: Vec<Leave>,
    pub users: Vec<User>,
}

impl Seed {
    /// Hashes user passwords that are given in plain text, so a seed file
    /// may carry readable credentials. PHC strings are kept as they are.
    pub fn hash_plain_passwords(&mut self) -> Result<(), argon2::password_hash::Error> {
        for user in &mut self.users {
            if !is_password_hash(&user.password) {
                user.password = hash_password(&user.password)?;
            }
        }
        Ok(())
    }
}

struct RefreshToken {
    user_id: u64,
    expires_at: i64,
    revoked: bool,
}

impl RefreshToken {
    fn is_active(&self, now: i64) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Default)]
struct State {
    employees: BTreeMap<u64, SeedEmployee>,
    projects: BTreeMap<u64, Project>,
    leaves: BTreeMap<u64, Leave>,
    next_leave_id: u64,
    users: HashMap<String, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl State {
    fn ensure_employee(&self, employee_id: u64) -> RepoResult<()> {
        if self.employees.contains_key(&employee_id) {
            Ok(())
        } else {
            Err(RepoError::employee_not_found(employee_id))
        }
    }

    fn ensure_owned(&self, employee_id: u64, leave_id: u64) -> RepoResult<()> {
        match self.leaves.get(&leave_id) {
            None => Err(RepoError::leave_not_found(leave_id)),
            Some(leave) if leave.employee_id != employee_id => {
                Err(RepoError::leave_not_owned(leave_id, employee_id))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Store kept entirely in process memory. One lock guards the whole state,
/// so each batch is checked and applied atomically.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn from_seed(seed: Seed) -> Self {
        let next_leave_id = seed.leaves.iter().map(|l| l.id).max().unwrap_or(0) + 1;

        let state = State {
            employees: seed.employees.into_iter().map(|e| (e.record.id, e)).collect(),
            projects: seed.projects.into_iter().map(|p| (p.id, p)).collect(),
            leaves: seed.leaves.into_iter().map(|l| (l.id, l)).collect(),
            next_leave_id,
            users: seed
                .users
                .into_iter()
                .map(|u| (u.username.to_lowercase(), u))
                .collect(),
            refresh_tokens: HashMap::new(),
        };

        Self {
            state: RwLock::new(state),
        }
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let mut seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("invalid seed file {}", path.display()))?;
        seed.hash_plain_passwords()
            .map_err(|e| anyhow::anyhow!("failed to hash seed passwords: {}", e))?;
        Ok(Self::from_seed(seed))
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| RepoError::Database("store lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| RepoError::Database("store lock poisoned".into()))
    }
}

#[async_trait]
impl EmployeeStore for InMemoryStore {
    async fn find_employee(&self, employee_id: u64) -> RepoResult<Employee> {
        let state = self.read()?;
        let entry = state
            .employees
            .get(&employee_id)
            .ok_or_else(|| RepoError::employee_not_found(employee_id))?;

        let projects = entry
            .project_ids
            .iter()
            .filter_map(|id| state.projects.get(id).cloned())
            .collect();

        Ok(Employee::from_record(entry.record.clone(), projects))
    }

    async fn find_leaves(&self, employee_id: u64) -> RepoResult<Vec<Leave>> {
        let state = self.read()?;
        state.ensure_employee(employee_id)?;

        Ok(state
            .leaves
            .values()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn add_leaves(
        &self,
        employee_id: u64,
        leaves: Vec<NewLeave>,
    ) -> RepoResult<Vec<Leave>> {
        let mut state = self.write()?;
        state.ensure_employee(employee_id)?;

        let mut added = Vec::with_capacity(leaves.len());
        for new_leave in leaves {
            let id = state.next_leave_id;
            state.next_leave_id += 1;

            let leave = new_leave.into_leave(id, employee_id);
            state.leaves.insert(id, leave.clone());
            added.push(leave);
        }

        Ok(added)
    }

    async fn update_leaves(&self, employee_id: u64, leaves: Vec<Leave>) -> RepoResult<()> {
        let mut state = self.write()?;
        state.ensure_employee(employee_id)?;

        for leave in &leaves {
            state.ensure_owned(employee_id, leave.id)?;
        }

        for leave in leaves {
            state.leaves.insert(
                leave.id,
                Leave {
                    employee_id,
                    ..leave
                },
            );
        }

        Ok(())
    }

    async fn delete_leaves(&self, employee_id: u64, leave_ids: &[u64]) -> RepoResult<()> {
        let mut state = self.write()?;
        state.ensure_employee(employee_id)?;

        for &leave_id in leave_ids {
            state.ensure_owned(employee_id, leave_id)?;
        }

        for leave_id in leave_ids {
            state.leaves.remove(leave_id);
        }

        Ok(())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        Ok(self.read()?.projects.values().cloned().collect())
    }

    async fn find_project(&self, project_id: u64) -> RepoResult<Project> {
        self.read()?
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("Project {} not found", project_id)))
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_user(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self.read()?.users.get(&username.to_lowercase()).cloned())
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> RepoResult<()> {
        let now = Utc::now().timestamp();
        let mut state = self.write()?;

        state.refresh_tokens.retain(|_, token| token.is_active(now));
        state.refresh_tokens.insert(
            jti.to_string(),
            RefreshToken {
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<Option<u64>> {
        let now = Utc::now().timestamp();
        let mut state = self.write()?;
        match state.refresh_tokens.get_mut(jti) {
            Some(token) if token.is_active(now) => {
                token.revoked = true;
                Ok(Some(token.user_id))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        auth::password::verify_password,
        model::leave::{LeaveStatus, LeaveType},
    };
    use chrono::NaiveDate;

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn employee(id: u64, project_ids: Vec<u64>) -> SeedEmployee {
        SeedEmployee {
            record: EmployeeRecord {
                id,
                first_name: format!("First{}", id),
                second_name: format!("Second{}", id),
                mail: format!("employee{}@company.com", id),
                max_role: "Employee".to_string(),
            },
            project_ids,
        }
    }

    pub(crate) fn leave(id: u64, employee_id: u64) -> Leave {
        Leave {
            id,
            employee_id,
            start_date: date("2026-03-02"),
            end_date: date("2026-03-06"),
            leave_type: LeaveType::Annual,
            status: LeaveStatus::Pending,
        }
    }

    /// Employees 7, 9 and 12; leave 101 belongs to 9, leave 102 to 7.
    pub(crate) fn seeded_store() -> InMemoryStore {
        InMemoryStore::from_seed(Seed {
            employees: vec![employee(7, vec![1, 2]), employee(9, vec![]), employee(12, vec![])],
            projects: vec![
                Project {
                    id: 1,
                    name: "Payroll migration".to_string(),
                },
                Project {
                    id: 2,
                    name: "Timesheet portal".to_string(),
                },
            ],
            leaves: vec![leave(101, 9), leave(102, 7)],
            users: vec![],
        })
    }

    fn new_leave() -> NewLeave {
        NewLeave {
            start_date: date("2026-05-04"),
            end_date: date("2026-05-05"),
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Pending,
        }
    }

    #[actix_web::test]
    async fn find_employee_resolves_projects() {
        let store = seeded_store();
        let employee = store.find_employee(7).await.unwrap();
        let names: Vec<_> = employee.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Payroll migration", "Timesheet portal"]);
    }

    #[actix_web::test]
    async fn unknown_employee_is_not_found() {
        let store = seeded_store();
        assert_eq!(
            store.find_employee(42).await.unwrap_err(),
            RepoError::employee_not_found(42)
        );
        assert!(matches!(
            store.find_leaves(42).await,
            Err(RepoError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn employee_without_leaves_has_empty_list() {
        let store = seeded_store();
        assert!(store.find_leaves(12).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn added_leaves_get_fresh_ids() {
        let store = seeded_store();
        let added = store.add_leaves(12, vec![new_leave(), new_leave()]).await.unwrap();

        assert_eq!(added.iter().map(|l| l.id).collect::<Vec<_>>(), vec![103, 104]);
        assert_eq!(store.find_leaves(12).await.unwrap(), added);
    }

    #[actix_web::test]
    async fn add_for_unknown_employee_is_not_found() {
        let store = seeded_store();
        assert!(matches!(
            store.add_leaves(42, vec![new_leave()]).await,
            Err(RepoError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn delete_foreign_leave_is_forbidden_and_keeps_it() {
        let store = seeded_store();

        let err = store.delete_leaves(7, &[101]).await.unwrap_err();
        assert_eq!(err, RepoError::leave_not_owned(101, 7));
        assert_eq!(store.find_leaves(9).await.unwrap(), vec![leave(101, 9)]);
    }

    #[actix_web::test]
    async fn delete_batch_is_all_or_nothing() {
        let store = seeded_store();

        assert!(store.delete_leaves(7, &[102, 999]).await.is_err());
        assert_eq!(store.find_leaves(7).await.unwrap().len(), 1);

        store.delete_leaves(7, &[102]).await.unwrap();
        assert!(store.find_leaves(7).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn update_checks_existence_and_ownership() {
        let store = seeded_store();

        assert_eq!(
            store.update_leaves(7, vec![leave(555, 7)]).await.unwrap_err(),
            RepoError::leave_not_found(555)
        );
        assert!(matches!(
            store.update_leaves(7, vec![leave(101, 7)]).await,
            Err(RepoError::Forbidden(_))
        ));

        let mut changed = leave(102, 7);
        changed.status = LeaveStatus::Approved;
        store.update_leaves(7, vec![changed.clone()]).await.unwrap();
        assert_eq!(store.find_leaves(7).await.unwrap(), vec![changed]);
    }

    #[actix_web::test]
    async fn update_batch_is_all_or_nothing() {
        let store = seeded_store();

        let mut own = leave(102, 7);
        own.status = LeaveStatus::Approved;

        assert_eq!(
            store.update_leaves(7, vec![own.clone(), leave(101, 7)]).await.unwrap_err(),
            RepoError::leave_not_owned(101, 7)
        );
        assert_eq!(
            store.update_leaves(7, vec![own, leave(555, 7)]).await.unwrap_err(),
            RepoError::leave_not_found(555)
        );

        assert_eq!(store.find_leaves(7).await.unwrap(), vec![leave(102, 7)]);
        assert_eq!(store.find_leaves(9).await.unwrap(), vec![leave(101, 9)]);
    }

    fn in_one_hour() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[actix_web::test]
    async fn refresh_token_revokes_once() {
        let store = seeded_store();
        store.save_refresh_token(3, "jti-1", in_one_hour()).await.unwrap();

        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), Some(3));
        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), None);
        assert_eq!(store.revoke_refresh_token("unknown").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn saving_a_refresh_token_prunes_stale_ones() {
        let store = seeded_store();
        store.save_refresh_token(3, "expired", Utc::now().timestamp() - 1).await.unwrap();
        store.save_refresh_token(3, "revoked", in_one_hour()).await.unwrap();
        store.revoke_refresh_token("revoked").await.unwrap();

        store.save_refresh_token(3, "fresh", in_one_hour()).await.unwrap();

        let state = store.read().unwrap();
        let mut kept: Vec<&str> = state.refresh_tokens.keys().map(String::as_str).collect();
        kept.sort();
        assert_eq!(kept, vec!["fresh"]);
    }

    #[actix_web::test]
    async fn expired_refresh_token_cannot_be_revoked() {
        let store = seeded_store();
        store.save_refresh_token(3, "old", Utc::now().timestamp() - 1).await.unwrap();

        assert_eq!(store.revoke_refresh_token("old").await.unwrap(), None);
    }

    #[test]
    fn seed_passwords_in_plain_text_are_hashed() {
        let hashed = hash_password("already hashed").unwrap();
        let user = |id: u64, username: &str, password: &str| User {
            id,
            username: username.to_string(),
            password: password.to_string(),
            role_id: 3,
            employee_id: None,
        };
        let mut seed = Seed {
            users: vec![user(1, "plain", "change-me"), user(2, "hashed", &hashed)],
            ..Seed::default()
        };

        seed.hash_plain_passwords().unwrap();

        assert!(verify_password("change-me", &seed.users[0].password).is_ok());
        assert_eq!(seed.users[1].password, hashed);
    }

    #[test]
    fn seed_parses_from_json() {
        let seed: Seed = serde_json::from_str(
            r#"{
                "employees": [{"id": 1, "first_name": "Ada", "second_name": "Lovelace",
                               "mail": "ada@company.com", "max_role": "Admin", "project_ids": [5]}],
                "projects": [{"id": 5, "name": "Engine"}],
                "leaves": [{"id": 3, "employee_id": 1, "start_date": "2026-01-05",
                            "end_date": "2026-01-06", "leave_type": "annual", "status": "approved"}]
            }"#,
        )
        .unwrap();

        assert_eq!(seed.employees[0].record.first_name, "Ada");
        assert_eq!(seed.employees[0].project_ids, vec![5]);
        assert_eq!(seed.leaves[0].status, crate::model::leave::LeaveStatus::Approved);
        assert!(seed.users.is_empty());
    }
}
