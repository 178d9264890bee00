use crate::{error::ApiError, model::role::Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Caller identity, placed in the request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string())),
        )
    }
}

impl AuthUser {
    /// The "AccessAllowed" policy: privileged roles see everyone, anyone
    /// else only the employee record they are linked to.
    pub fn require_access_allowed(&self, employee_id: u64) -> Result<(), ApiError> {
        if self.role.can_view_any_employee() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Access to employee {} is not allowed",
                employee_id
            )))
        }
    }
}
