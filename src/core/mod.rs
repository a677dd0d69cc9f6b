pub mod error;
pub mod types;

pub use error::{AuthError, DeliveryError, GateResult, GatewayError, StoreError};
pub use types::{BroadcastMessage, ConnectionId, TopicKind};
