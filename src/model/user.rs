use serde::Deserialize;

/// Login account. `password` holds an argon2 PHC string.
#[derive(Debug, Clone, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
}
