pub mod announcements;
pub mod audit_log;
pub mod auth;
pub mod contact_book;
pub mod grades;
pub mod health;
pub mod leaves;
pub mod messages;
pub mod photos;
pub mod pickup;
pub mod reports;
pub mod students;
pub mod users;
pub mod websocket;
