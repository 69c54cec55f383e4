pub mod contacts;
pub mod groups;
pub mod health;
pub mod users;
