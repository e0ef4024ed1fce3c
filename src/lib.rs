pub mod capture;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod diagnosis;
pub mod error;
pub mod llm;
pub mod preferences;
pub mod server;

pub use error::{Error, Result};
