// user-backend/src/repository/mod.rs
pub mod user_repository;
