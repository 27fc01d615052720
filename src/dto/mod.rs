pub mod auth_dto;
pub mod chat_dto;
pub mod contact_dto;
