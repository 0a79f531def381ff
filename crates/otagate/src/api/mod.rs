//! API route handlers

pub mod devices;
pub mod docs;
pub mod error;
pub mod system;

pub use error::AppError;
