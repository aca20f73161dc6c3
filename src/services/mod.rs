pub mod auth;
pub mod catalog;
pub mod listings;
pub mod moderation;
pub mod registration;
