pub mod directory;
mod error;
pub mod models;
pub mod ports;
pub mod services;
pub mod upload;

pub use error::*;
