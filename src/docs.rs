use crate::api::employee::{EmployeeDto, LeaveDto, LeaveInput, LeaveUpdate};
use crate::api::project::ProjectDto;
use crate::model::leave::{LeaveStatus, LeaveType};
use crate::utils::validation::FieldError;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timesheet API",
        version = "1.0.0",
        description = r#"
## Timesheet & Leave Tracking

Backend for recording employee absences and browsing project assignments.

### 🔹 Key Features
- **Employee info**
  - Profile with the projects an employee works on
- **Leave Management**
  - List, add, update and delete leaves of one employee
  - Update and delete only touch leaves owned by the employee in the path
- **Projects**
  - Read-only project catalogue

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer** access token from `/auth/login`.
Employees may only read their own profile; Admin, HR and System roles may read any.

### 📦 Response Format
- JSON bodies; errors are `{"message": ...}`
- Validation failures add an `errors` list of `{field, message}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::get_info,
        crate::api::employee::get_leaves,
        crate::api::employee::add_leaves,
        crate::api::employee::update_leaves,
        crate::api::employee::delete_leaves,

        crate::api::project::list_projects,
        crate::api::project::get_project
    ),
    components(
        schemas(
            EmployeeDto,
            LeaveDto,
            LeaveInput,
            LeaveUpdate,
            LeaveType,
            LeaveStatus,
            ProjectDto,
            FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Employee", description = "Employee info APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Project", description = "Project catalogue APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_employee_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/employee/{employee_id}/leaves"));
        assert!(doc.paths.paths.contains_key("/api/project/{project_id}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
