pub mod chat_service;
pub mod moderation;
pub mod session;
pub mod submission;
