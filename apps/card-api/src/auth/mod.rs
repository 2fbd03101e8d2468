pub mod middleware;
pub mod roles;
pub mod tokens;
