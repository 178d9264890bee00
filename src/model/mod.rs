pub mod employee;
pub mod leave;
pub mod project;
pub mod role;
pub mod user;
