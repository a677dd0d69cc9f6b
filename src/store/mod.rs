pub mod db;
pub mod nonces;
pub mod outbox;
pub mod subscriptions;

pub use db::{get_store, init_store, GatewayStore};
pub use nonces::NonceRecord;
pub use outbox::OutboxItem;
pub use subscriptions::SubscriptionRow;
