mod media_config;
mod media_engine;
mod media_session;
mod media_track;
#[cfg(feature = "rtc")]
pub mod rtc;

pub use media_config::*;
pub use media_engine::*;
pub use media_session::*;
pub use media_track::*;
