pub mod codec;
pub mod error;
pub mod model;
pub mod utils;

pub use error::{
    CodecError, ConfigError, Error, InvalidStateError, MediaFailure, NegotiationFailure, Result,
    SignalingFailure, TransportFailure,
};
pub use model::*;
