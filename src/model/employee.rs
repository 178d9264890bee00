use serde::Deserialize;

use super::project::Project;

/// Employee row as stored in `employees`.
#[derive(Debug, Clone, PartialEq, Deserialize, sqlx::FromRow)]
pub struct EmployeeRecord {
    pub id: u64,
    pub first_name: String,
    pub second_name: String,
    pub mail: String,
    pub max_role: String,
}

/// Employee together with the projects they are assigned to.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: u64,
    pub first_name: String,
    pub second_name: String,
    pub mail: String,
    pub max_role: String,
    pub projects: Vec<Project>,
}

impl Employee {
    pub fn from_record(record: EmployeeRecord, projects: Vec<Project>) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name,
            second_name: record.second_name,
            mail: record.mail,
            max_role: record.max_role,
            projects,
        }
    }
}
