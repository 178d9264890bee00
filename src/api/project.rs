use crate::{auth::auth::AuthUser, error::ApiError, model::project::Project, store::Stores};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectDto {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Timesheet portal")]
    pub name: String,
}

impl From<Project> for ProjectDto {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
        }
    }
}

/// List projects
#[utoipa::path(
    get,
    path = "/api/project",
    responses(
        (status = 200, description = "All projects", body = [ProjectDto]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Project",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_projects(
    _auth: AuthUser,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, ApiError> {
    let projects: Vec<ProjectDto> = stores
        .projects
        .list_projects()
        .await?
        .into_iter()
        .map(ProjectDto::from)
        .collect();

    Ok(HttpResponse::Ok().json(projects))
}

/// Get Project by ID
#[utoipa::path(
    get,
    path = "/api/project/{project_id}",
    params(
        ("project_id" = u64, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project found", body = ProjectDto),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Project not found", body = Object, example = json!({
            "message": "Project 3 not found"
        }))
    ),
    tag = "Project",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_project(
    _auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let project = stores.projects.find_project(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ProjectDto::from(project)))
}
