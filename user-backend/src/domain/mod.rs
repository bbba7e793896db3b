// user-backend/src/domain/mod.rs
pub mod user_model;
