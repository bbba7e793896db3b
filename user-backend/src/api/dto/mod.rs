// user-backend/src/api/dto/mod.rs
pub mod auth_dto;
