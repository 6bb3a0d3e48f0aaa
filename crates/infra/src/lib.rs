//! Infrastructure layer: storage, mail, config, and the application services.

pub mod config;
pub mod directory;
pub mod mail;
pub mod services;
