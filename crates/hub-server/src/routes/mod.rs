pub mod admin;
pub mod chat;
pub mod documents;
pub mod health;
pub mod search;
pub mod upload;
pub mod users;
