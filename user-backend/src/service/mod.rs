// user-backend/src/service/mod.rs
pub mod auth_service;
