pub mod auth;
pub mod core;
pub mod roster;
pub mod students;
pub mod view;
