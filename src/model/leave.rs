use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
    Other,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A persisted leave entry. Always owned by exactly one employee.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Leave {
    pub id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
}

/// A leave that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeave {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
}

impl NewLeave {
    pub fn into_leave(self, id: u64, employee_id: u64) -> Leave {
        Leave {
            id,
            employee_id,
            start_date: self.start_date,
            end_date: self.end_date,
            leave_type: self.leave_type,
            status: self.status,
        }
    }
}
