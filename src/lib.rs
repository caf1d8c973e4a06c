pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod room;
pub mod state;
pub mod transport;
pub mod ws;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
