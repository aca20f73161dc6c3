pub mod card;
pub mod institution;
pub mod request;
pub mod user;
