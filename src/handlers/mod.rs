pub mod admin;
pub mod agent;
pub mod general;
pub mod tax;
pub mod users;
