pub mod chat;
pub mod job;
pub mod settings;
pub mod user;
