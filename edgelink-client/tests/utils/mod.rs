mod mock_transport;

pub use mock_engine::*;
pub use mock_transport::*;
pub use session_helpers::*;
