pub mod authentication;
pub mod dashboard;
pub mod index;
