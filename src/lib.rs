pub mod config;
pub mod error;
pub mod events;
pub mod gestures;
pub mod grid;
pub mod interaction;
pub mod provider;
pub mod touch;
pub mod utils;

pub use config::Config;
pub use error::{GestureError, Result};
