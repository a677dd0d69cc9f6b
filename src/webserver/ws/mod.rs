/// WebSocket layer
///
/// One /ws endpoint per client, admitted through the nonce handshake
/// before the upgrade completes. Each socket gets a buffered channel in
/// the hub; the fan-out engines write frames into that channel and the
/// connection loop drains it to the wire.
///
/// ## Key Components
/// - `hub`: registry of live sockets and their outbound channels
/// - `connection`: socket lifecycle, control commands, cleanup
/// - `message`: client command and server frame schemas
/// - `health`: heartbeat and idle tracking
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;

pub use hub::{ConnectionSender, WsHub};
pub use message::{ClientMessage, ServerMessage};
