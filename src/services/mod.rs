pub mod audit;
pub mod auth;
pub mod contact_book;
pub mod kpi;
pub mod leave;
pub mod photos;
pub mod pickup;
pub mod realtime;
pub mod students;
