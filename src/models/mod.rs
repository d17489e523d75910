pub mod announcement;
pub mod auth;
pub mod contact_book;
pub mod grade;
pub mod leave;
pub mod message;
pub mod pickup;
pub mod student;
pub mod user;
