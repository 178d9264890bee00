use crate::{
    api::project::ProjectDto,
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        employee::Employee,
        leave::{Leave, LeaveStatus, LeaveType, NewLeave},
    },
    store::Stores,
    utils::validation::{
        ValidationErrors, validate_leave_ids, validate_leave_updates, validate_new_leaves,
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 7,
    "first_name": "John",
    "second_name": "Doe",
    "mail": "john.doe@company.com",
    "max_role": "Employee",
    "projects": [{"id": 1, "name": "Timesheet portal"}]
}))]
pub struct EmployeeDto {
    pub id: u64,
    pub first_name: String,
    pub second_name: String,
    pub mail: String,
    pub max_role: String,
    pub projects: Vec<ProjectDto>,
}

impl From<Employee> for EmployeeDto {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            first_name: employee.first_name,
            second_name: employee.second_name,
            mail: employee.mail,
            max_role: employee.max_role,
            projects: employee.projects.into_iter().map(ProjectDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaveDto {
    #[schema(example = 101)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
}

impl From<Leave> for LeaveDto {
    fn from(leave: Leave) -> Self {
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            leave_type: leave.leave_type,
            status: leave.status,
        }
    }
}

/// New leave entry; the owner comes from the path.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveInput {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    /// Defaults to `pending`
    #[serde(default)]
    pub status: Option<LeaveStatus>,
}

impl From<LeaveInput> for NewLeave {
    fn from(input: LeaveInput) -> Self {
        Self {
            start_date: input.start_date,
            end_date: input.end_date,
            leave_type: input.leave_type,
            status: input.status.unwrap_or_default(),
        }
    }
}

/// Full replacement of an existing leave, addressed by `id`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveUpdate {
    #[schema(example = 101)]
    pub id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
}

impl LeaveUpdate {
    pub fn into_leave(self, employee_id: u64) -> Leave {
        Leave {
            id: self.id,
            employee_id,
            start_date: self.start_date,
            end_date: self.end_date,
            leave_type: self.leave_type,
            status: self.status,
        }
    }
}

/// Get Employee info
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/info",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller may not view this employee"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee 42 not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_info(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require_access_allowed(employee_id)?;

    let employee = stores.employees.find_employee(employee_id).await?;

    Ok(HttpResponse::Ok().json(EmployeeDto::from(employee)))
}

/// List leaves of an employee
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/leaves",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Leaves of the employee", body = [LeaveDto]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee 42 not found"
        }))
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_leaves(
    _auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();

    let leaves: Vec<LeaveDto> = stores
        .employees
        .find_leaves(employee_id)
        .await?
        .into_iter()
        .map(LeaveDto::from)
        .collect();

    debug!(employee_id, leave_count = leaves.len(), "Fetched leaves");
    Ok(HttpResponse::Ok().json(leaves))
}

/// Add leaves for an employee
#[utoipa::path(
    post,
    path = "/api/employee/{employee_id}/leaves",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body(
        content = [LeaveInput],
        description = "Leaves to append",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leaves added"),
        (status = 400, description = "Missing or invalid body", body = Object, example = json!({
            "message": "Validation failed",
            "errors": [{
                "field": "[0].end_date",
                "message": "end_date must not be before start_date"
            }]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn add_leaves(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
    body: web::Json<Option<Vec<LeaveInput>>>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    let leaves = validate_new_leaves(body.into_inner())?;

    let added = stores.employees.add_leaves(employee_id, leaves).await?;

    info!(
        employee_id,
        user_id = auth.user_id,
        username = %auth.username,
        leave_count = added.len(),
        "Leaves added"
    );
    Ok(HttpResponse::Ok().finish())
}

/// Update leaves of an employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/leaves",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body(
        content = [LeaveUpdate],
        description = "Leaves to replace, matched by id",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leaves updated"),
        (status = 400, description = "Missing or invalid body"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "A leave belongs to another employee"),
        (status = 404, description = "Employee or leave not found")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_leaves(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
    body: web::Json<Option<Vec<LeaveUpdate>>>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    let leaves = validate_leave_updates(employee_id, body.into_inner())?;
    let leave_count = leaves.len();

    stores.employees.update_leaves(employee_id, leaves).await?;

    info!(
        employee_id,
        user_id = auth.user_id,
        username = %auth.username,
        leave_count,
        "Leaves updated"
    );
    Ok(HttpResponse::Ok().finish())
}

/// Delete leaves of an employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}/leaves",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        (
            "leaveID" = Vec<u64>,
            Query,
            description = "Leave id, repeat for several: ?leaveID=1&leaveID=2"
        )
    ),
    responses(
        (status = 200, description = "Leaves deleted"),
        (status = 400, description = "Missing or malformed leave ids"),
        (status = 401, description = "Unauthorized"),
        (
            status = 403,
            description = "A leave belongs to another employee",
            body = Object,
            example = json!({"message": "Leave 101 does not belong to employee 7"})
        ),
        (status = 404, description = "Employee or leave not found")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_leaves(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();

    // repeated keys, so decode into pairs rather than a struct
    let pairs = web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .map_err(|e| ValidationErrors::single("query", e.to_string()))?
        .into_inner();
    let leave_ids = validate_leave_ids(&pairs)?;

    stores.employees.delete_leaves(employee_id, &leave_ids).await?;

    info!(
        employee_id,
        user_id = auth.user_id,
        username = %auth.username,
        leave_ids = ?leave_ids,
        "Leaves deleted"
    );
    Ok(HttpResponse::Ok().finish())
}
