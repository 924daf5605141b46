pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod selection;
pub mod services;
pub mod session;
pub mod store;
pub mod viewport;

pub use config::Config;
pub use error::SeatMapError;
pub use session::{EventOutcome, Notice, SeatMapSession, SessionEvent};
