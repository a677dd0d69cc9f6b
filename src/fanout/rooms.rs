/// Rooms engine (per-topic actors)
///
/// One single-threaded actor per topic owns that topic's live-socket set.
/// All access goes through the actor's mailbox, so publishes to one topic
/// are serialized and no lock guards the member map. An actor whose set
/// empties goes dormant (the task exits); the next join or publish for
/// the topic transparently spawns a fresh one.
use super::{delivery, Broadcaster};
use crate::arguments::is_debug_rooms_enabled;
use crate::core::{BroadcastMessage, ConnectionId, GateResult, GatewayError};
use crate::global;
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;
use crate::webserver::ws::hub::ConnectionSender;
use crate::webserver::ws::message::ServerMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};

const ROOM_MAILBOX_SIZE: usize = 64;

/// Snapshot of one room, answered through its mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStats {
    pub room_key: String,
    pub members: usize,
}

enum RoomCmd {
    Join {
        conn_id: ConnectionId,
        sender: ConnectionSender,
        ack: oneshot::Sender<()>,
    },
    Leave {
        conn_id: ConnectionId,
    },
    Publish {
        frame: ServerMessage,
    },
    Inspect {
        reply: oneshot::Sender<RoomStats>,
    },
}

struct RoomMember {
    sender: ConnectionSender,
    joined_at: i64,
    last_seen_at: i64,
}

// =============================================================================
// ROOM MANAGER
// =============================================================================

/// Routes commands to per-topic actors, spawning them on demand
pub struct RoomManager {
    rooms: RwLock<HashMap<String, mpsc::Sender<RoomCmd>>>,
    store: Arc<GatewayStore>,
    dispatch_timeout: Duration,
}

impl RoomManager {
    pub fn new(store: Arc<GatewayStore>, dispatch_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            dispatch_timeout,
        })
    }

    /// Add a connection to a topic's room
    ///
    /// Joins are confirmed by the actor. A join racing into an actor that
    /// is going dormant loses its ack and is retried against the respawned
    /// actor, so membership is never silently dropped.
    pub async fn join(
        &self,
        room_key: &str,
        conn_id: &str,
        sender: ConnectionSender,
    ) -> GateResult<()> {
        for _ in 0..2 {
            let (ack_tx, ack_rx) = oneshot::channel();
            self.dispatch(
                room_key,
                RoomCmd::Join {
                    conn_id: conn_id.to_string(),
                    sender: sender.clone(),
                    ack: ack_tx,
                },
            )
            .await?;
            if ack_rx.await.is_ok() {
                return Ok(());
            }
        }
        Err(GatewayError::Fanout(format!("Room {} did not confirm join", room_key)))
    }

    /// Remove a connection from a topic's room
    ///
    /// Fire-and-forget: if the actor is already gone, so is the
    /// membership.
    pub async fn leave(&self, room_key: &str, conn_id: &str) -> GateResult<()> {
        self.dispatch(room_key, RoomCmd::Leave { conn_id: conn_id.to_string() }).await
    }

    /// Hand a rendered frame to the topic's actor
    pub async fn publish_frame(&self, room_key: &str, frame: ServerMessage) -> GateResult<()> {
        self.dispatch(room_key, RoomCmd::Publish { frame }).await
    }

    /// Ask a room for its member count
    pub async fn inspect(&self, room_key: &str) -> GateResult<RoomStats> {
        for _ in 0..2 {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.dispatch(room_key, RoomCmd::Inspect { reply: reply_tx }).await?;
            if let Ok(stats) = reply_rx.await {
                return Ok(stats);
            }
        }
        Err(GatewayError::Fanout(format!("Room {} did not answer inspection", room_key)))
    }

    /// Rooms whose actor is currently alive
    pub async fn active_rooms(&self) -> usize {
        self.rooms.read().await.values().filter(|s| !s.is_closed()).count()
    }

    /// Drop map entries for dormant actors; the sweeper calls this
    pub async fn prune_closed(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, sender| !sender.is_closed());
        before - rooms.len()
    }

    async fn dispatch(&self, room_key: &str, cmd: RoomCmd) -> GateResult<()> {
        let existing = { self.rooms.read().await.get(room_key).cloned() };

        let cmd = match existing {
            Some(sender) => match sender.send_timeout(cmd, self.dispatch_timeout).await {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                    return Err(GatewayError::Fanout(format!(
                        "Room {} mailbox timed out",
                        room_key
                    )));
                }
                // Dormant actor: recover the command and respawn
                Err(mpsc::error::SendTimeoutError::Closed(cmd)) => cmd,
            },
            None => cmd,
        };

        self.respawn_and_send(room_key, cmd).await
    }

    async fn respawn_and_send(&self, room_key: &str, cmd: RoomCmd) -> GateResult<()> {
        let sender = {
            let mut rooms = self.rooms.write().await;
            match rooms.get(room_key) {
                // Another dispatcher respawned it first
                Some(s) if !s.is_closed() => s.clone(),
                _ => {
                    let (tx, rx) = mpsc::channel(ROOM_MAILBOX_SIZE);
                    tokio::spawn(room_actor(room_key.to_string(), self.store.clone(), rx));
                    rooms.insert(room_key.to_string(), tx.clone());
                    tx
                }
            }
        };

        sender
            .send_timeout(cmd, self.dispatch_timeout)
            .await
            .map_err(|e| GatewayError::Fanout(format!("Room {} dispatch failed: {}", room_key, e)))
    }
}

// =============================================================================
// ROOM ACTOR
// =============================================================================

async fn room_actor(
    room_key: String,
    store: Arc<GatewayStore>,
    mut mailbox: mpsc::Receiver<RoomCmd>,
) {
    let mut members: HashMap<ConnectionId, RoomMember> = HashMap::new();
    logger::debug(LogTag::Rooms, &format!("Room {} activated", room_key));

    loop {
        let Some(cmd) = mailbox.recv().await else {
            break;
        };
        handle_cmd(&room_key, &store, &mut members, cmd).await;

        if members.is_empty() {
            // Drain commands that raced in before going dormant; a drained
            // join keeps the room alive.
            while let Ok(cmd) = mailbox.try_recv() {
                handle_cmd(&room_key, &store, &mut members, cmd).await;
                if !members.is_empty() {
                    break;
                }
            }
            if members.is_empty() {
                break;
            }
        }
    }

    logger::debug(LogTag::Rooms, &format!("Room {} dormant", room_key));
}

async fn handle_cmd(
    room_key: &str,
    store: &GatewayStore,
    members: &mut HashMap<ConnectionId, RoomMember>,
    cmd: RoomCmd,
) {
    match cmd {
        RoomCmd::Join { conn_id, sender, ack } => {
            let now = global::now_ms();
            members.insert(
                conn_id,
                RoomMember {
                    sender,
                    joined_at: now,
                    last_seen_at: now,
                },
            );
            let _ = ack.send(());
        }
        RoomCmd::Leave { conn_id } => {
            members.remove(&conn_id);
        }
        RoomCmd::Publish { frame } => {
            let mut dead = Vec::new();
            for (conn_id, member) in members.iter_mut() {
                match member.sender.try_send(frame.clone()) {
                    Ok(()) => member.last_seen_at = global::now_ms(),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        if is_debug_rooms_enabled() {
                            logger::debug(
                                LogTag::Rooms,
                                &format!(
                                    "Room {}: {} buffer full, frame skipped",
                                    room_key, conn_id
                                ),
                            );
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(conn_id.clone());
                    }
                }
            }

            for conn_id in dead {
                members.remove(&conn_id);
                match store.remove_all_for_connection(&conn_id).await {
                    Ok(removed) => logger::debug(
                        LogTag::Rooms,
                        &format!(
                            "Room {}: pruned dead connection {} ({} rows)",
                            room_key, conn_id, removed
                        ),
                    ),
                    Err(e) => logger::warning(
                        LogTag::Rooms,
                        &format!(
                            "Room {}: failed to prune dead connection {}: {}",
                            room_key, conn_id, e
                        ),
                    ),
                }
            }
        }
        RoomCmd::Inspect { reply } => {
            let _ = reply.send(RoomStats {
                room_key: room_key.to_string(),
                members: members.len(),
            });
        }
    }
}

// =============================================================================
// BROADCASTER FRONT
// =============================================================================

pub struct RoomBroadcaster {
    rooms: Arc<RoomManager>,
}

impl RoomBroadcaster {
    pub fn new(rooms: Arc<RoomManager>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl Broadcaster for RoomBroadcaster {
    async fn publish(&self, message: BroadcastMessage) -> GateResult<()> {
        let Some(frame) = delivery::render_update(&message) else {
            // Undecodable payloads are dropped at render time, same as the
            // queue engine
            return Ok(());
        };
        self.rooms.publish_frame(&message.room_key(), frame).await
    }

    fn engine_name(&self) -> &'static str {
        "rooms"
    }
}
