pub mod clock;
pub mod config;
pub mod entity;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use entity::*;
pub use error::*;
