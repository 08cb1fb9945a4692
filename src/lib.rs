pub mod config;
pub mod consumer;
pub mod db;
pub mod delivery;
pub mod enums;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod health;
pub mod models;
pub mod pipeline;

pub use config::Config;
pub use enums::{AlertType, Channel, ChangeDirection, Frequency};
pub use error::{AppError, Result};
