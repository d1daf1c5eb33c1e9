pub mod config;
pub mod files;
pub mod server;
pub mod text;
