use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: u64,
    pub name: String,
}
