//! WebRTC media engine talking to the device over its signaling stream.

mod peer_wrapper;
mod rtc_config;
mod rtc_engine;
mod rtc_track;
mod signaling_stream;

pub use peer_wrapper::*;
pub use rtc_config::*;
pub use rtc_engine::*;
pub use rtc_track::*;
pub use signaling_stream::*;
