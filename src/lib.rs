pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod firebase;
pub mod mailer;
pub mod payment;
pub mod server;
