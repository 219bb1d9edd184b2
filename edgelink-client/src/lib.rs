//! Client side of a device media session: the device connection, the media
//! session layered on it, and the session loop tying both together.

pub mod media;
pub mod session;
pub mod transport;

pub use media::*;
pub use session::*;
pub use transport::*;
