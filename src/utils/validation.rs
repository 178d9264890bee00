use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::employee::{LeaveInput, LeaveUpdate},
    model::leave::{Leave, NewLeave},
};

/// Query parameter carrying leave ids on delete, repeated once per id.
pub const LEAVE_ID_PARAM: &str = "leaveID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "[0].end_date")]
    pub field: String,
    #[schema(example = "end_date must not be before start_date")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(value)` if nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn require_body<T>(body: Option<Vec<T>>) -> Result<Vec<T>, ValidationErrors> {
    body.ok_or_else(|| ValidationErrors::single("body", "request body must not be null"))
}

fn check_date_range(errors: &mut ValidationErrors, index: usize, start: NaiveDate, end: NaiveDate) {
    if end < start {
        errors.push(
            format!("[{}].end_date", index),
            "end_date must not be before start_date",
        );
    }
}

pub fn validate_new_leaves(
    body: Option<Vec<LeaveInput>>,
) -> Result<Vec<NewLeave>, ValidationErrors> {
    let leaves = require_body(body)?;

    let mut errors = ValidationErrors::default();
    for (index, leave) in leaves.iter().enumerate() {
        check_date_range(&mut errors, index, leave.start_date, leave.end_date);
    }

    errors.finish(leaves.into_iter().map(NewLeave::from).collect())
}

/// Checks an update batch and binds every entry to `employee_id`.
pub fn validate_leave_updates(
    employee_id: u64,
    body: Option<Vec<LeaveUpdate>>,
) -> Result<Vec<Leave>, ValidationErrors> {
    let leaves = require_body(body)?;

    let mut errors = ValidationErrors::default();
    let mut seen = HashSet::with_capacity(leaves.len());
    for (index, leave) in leaves.iter().enumerate() {
        check_date_range(&mut errors, index, leave.start_date, leave.end_date);
        if !seen.insert(leave.id) {
            errors.push(
                format!("[{}].id", index),
                format!("leave {} appears more than once", leave.id),
            );
        }
    }

    errors.finish(
        leaves
            .into_iter()
            .map(|leave| leave.into_leave(employee_id))
            .collect(),
    )
}

/// Collects `leaveID` values from decoded query pairs; other keys are ignored.
pub fn validate_leave_ids(pairs: &[(String, String)]) -> Result<Vec<u64>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut ids = Vec::new();

    for (key, value) in pairs.iter().filter(|(key, _)| key == LEAVE_ID_PARAM) {
        match value.trim().parse::<u64>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => errors.push(key.as_str(), format!("'{}' is not a valid leave id", value)),
        }
    }

    if ids.is_empty() && errors.is_empty() {
        errors.push(LEAVE_ID_PARAM, "at least one leave id is required");
    }

    errors.finish(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave::{LeaveStatus, LeaveType};
    use crate::store::memory::tests::date;

    fn input(start: &str, end: &str) -> LeaveInput {
        LeaveInput {
            start_date: date(start),
            end_date: date(end),
            leave_type: LeaveType::Annual,
            status: None,
        }
    }

    fn update(id: u64, start: &str, end: &str) -> LeaveUpdate {
        LeaveUpdate {
            id,
            start_date: date(start),
            end_date: date(end),
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Approved,
        }
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn null_body_is_rejected() {
        let err = validate_new_leaves(None).unwrap_err();
        assert_eq!(err.errors()[0].field, "body");
        assert!(validate_leave_updates(1, None).is_err());
    }

    #[test]
    fn new_leaves_default_to_pending() {
        let leaves = validate_new_leaves(Some(vec![input("2026-02-02", "2026-02-02")])).unwrap();
        assert_eq!(leaves[0].status, LeaveStatus::Pending);
    }

    #[test]
    fn empty_batch_is_allowed() {
        assert!(validate_new_leaves(Some(vec![])).unwrap().is_empty());
    }

    #[test]
    fn reversed_date_range_reports_index() {
        let err = validate_new_leaves(Some(vec![
            input("2026-02-02", "2026-02-03"),
            input("2026-02-10", "2026-02-01"),
        ]))
        .unwrap_err();

        assert_eq!(
            err.errors(),
            &[FieldError {
                field: "[1].end_date".to_string(),
                message: "end_date must not be before start_date".to_string(),
            }]
        );
    }

    #[test]
    fn updates_are_bound_to_path_employee() {
        let leaves =
            validate_leave_updates(7, Some(vec![update(102, "2026-04-01", "2026-04-02")])).unwrap();
        assert_eq!(leaves[0].employee_id, 7);
        assert_eq!(leaves[0].status, LeaveStatus::Approved);
    }

    #[test]
    fn duplicate_update_ids_are_rejected() {
        let err = validate_leave_updates(
            7,
            Some(vec![
                update(102, "2026-04-01", "2026-04-02"),
                update(102, "2026-04-03", "2026-04-04"),
            ]),
        )
        .unwrap_err();
        assert_eq!(err.errors()[0].field, "[1].id");
    }

    #[test]
    fn leave_ids_are_collected_in_order() {
        let ids = validate_leave_ids(&pairs(&[
            ("leaveID", "3"),
            ("other", "x"),
            ("leaveID", "1"),
            ("leaveID", "3"),
        ]))
        .unwrap();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn missing_or_malformed_leave_ids_are_rejected() {
        assert!(validate_leave_ids(&[]).is_err());
        assert!(validate_leave_ids(&pairs(&[("leaveId", "1")])).is_err());

        let err = validate_leave_ids(&pairs(&[("leaveID", "abc")])).unwrap_err();
        assert_eq!(err.errors()[0].message, "'abc' is not a valid leave id");
    }
}
