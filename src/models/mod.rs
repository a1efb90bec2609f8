pub mod dashboard;
pub mod favorites;
pub mod location;
pub mod session;
pub mod units;
pub mod user;
