pub mod clock;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FrontierConfig;
pub use cooldown::CooldownMap;
pub use error::{ConfigError, FrontierError, Result};
