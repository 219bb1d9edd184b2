pub use edgelink_core::{ConnectionOptions, SessionId, TrackKind};

pub mod model {
    pub use edgelink_core::model::*;
}

pub mod error {
    pub use edgelink_core::error::*;
}

pub mod codec {
    pub use edgelink_core::codec::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use edgelink_client::*;
}
