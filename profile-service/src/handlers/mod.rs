pub mod error;
pub mod health;
pub mod profile;

pub use error::AppError;
