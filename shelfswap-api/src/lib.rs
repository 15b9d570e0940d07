pub mod config;
pub mod email;
pub mod server;
pub mod service;
