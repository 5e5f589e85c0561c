pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod query;
pub mod response;
pub mod seed;
pub mod state;
pub mod users;
pub mod validation;
