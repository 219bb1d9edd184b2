mod device_connection;
mod device_transport;
mod transport_config;
mod transport_event;

pub use device_connection::*;
pub use device_transport::*;
pub use transport_config::*;
pub use transport_event::*;
