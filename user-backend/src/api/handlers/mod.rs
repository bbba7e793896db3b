// user-backend/src/api/handlers/mod.rs
pub mod auth_handler;
