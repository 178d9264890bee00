use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    models::{LoginReqDto, TokenPair, TokenType},
    store::{AccountStore, Stores},
    utils::validation::ValidationErrors,
};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, info, instrument};

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues a fresh access/refresh pair and records the refresh token's `jti`.
async fn issue_token_pair(
    subject: &TokenSubject,
    accounts: &dyn AccountStore,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::Internal
        })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ApiError::Internal
            },
        )?;

    debug!(
        user_id = subject.user_id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    accounts
        .save_refresh_token(subject.user_id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[instrument(
    name = "auth_login",
    skip(stores, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    stores: web::Data<Stores>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ValidationErrors::single("body", "Username or password required").into());
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let db_user = match stores.accounts.find_user(username).await? {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(invalid());
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let tokens = issue_token_pair(&subject, &*stores.accounts, &config).await?;

    info!("Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotates a refresh token: the presented one is revoked, a new pair is issued.
pub async fn refresh_token(
    req: HttpRequest,
    stores: web::Data<Stores>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".to_string());

    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;

    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    match stores.accounts.revoke_refresh_token(&claims.jti).await? {
        Some(user_id) if user_id == claims.user_id => {}
        _ => {
            info!(user_id = claims.user_id, "Refresh token unknown or already revoked");
            return Err(unauthorized());
        }
    }

    let subject = TokenSubject::from(&claims);
    let tokens = issue_token_pair(&subject, &*stores.accounts, &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always answers 204.
pub async fn logout(
    req: HttpRequest,
    stores: web::Data<Stores>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match bearer_token(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = stores.accounts.revoke_refresh_token(&claims.jti).await {
        error!(error = %e, user_id = claims.user_id, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
