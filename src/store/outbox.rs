/// Durable fan-out queue
///
/// Messages are enqueued visible, claimed with an optimistic visibility
/// update, and deleted on ack. A crashed worker never loses a message:
/// the row reappears after its visibility timeout with a bumped
/// receive_count, so delivery is at-least-once.
use super::db::GatewayStore;
use crate::core::{BroadcastMessage, StoreError, TopicKind};
use crate::global;
use crate::logger::{self, LogTag};
use rusqlite::{params, OptionalExtension};

/// One claimed queue entry
#[derive(Debug, Clone)]
pub struct OutboxItem {
    pub id: i64,
    pub message: BroadcastMessage,
    pub receive_count: i64,
}

impl GatewayStore {
    /// Append a message to the queue, immediately visible
    pub async fn enqueue_outbox(&self, message: &BroadcastMessage) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(&message.payload)
            .map_err(|e| StoreError::Corrupt(format!("Failed to encode payload: {}", e)))?;
        let conn = self.get_write_connection()?;

        conn.execute(
            "INSERT INTO outbox (kind, topic_key, payload, enqueued_at, visible_at, receive_count)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                message.kind.as_str(),
                message.topic_key,
                payload,
                message.timestamp,
                global::now_ms()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Claim the oldest visible entry and hide it for the timeout window
    ///
    /// The conditional UPDATE is the claim: when two workers race for the
    /// same row, exactly one sees a changed row and the other retries on
    /// the next head. Undecodable rows are dropped here so they cannot
    /// wedge the queue.
    pub async fn claim_next_from_outbox(
        &self,
        visibility_timeout_ms: i64,
    ) -> Result<Option<OutboxItem>, StoreError> {
        let conn = self.get_write_connection()?;

        loop {
            let now = global::now_ms();
            let head = conn
                .query_row(
                    "SELECT id, kind, topic_key, payload, enqueued_at, receive_count
                     FROM outbox WHERE visible_at <= ?1 ORDER BY id LIMIT 1",
                    params![now],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, kind_str, topic_key, payload_str, enqueued_at, receive_count)) = head
            else {
                return Ok(None);
            };

            let claimed = conn.execute(
                "UPDATE outbox SET visible_at = ?1, receive_count = receive_count + 1
                 WHERE id = ?2 AND visible_at <= ?3",
                params![now + visibility_timeout_ms, id, now],
            )?;
            if claimed == 0 {
                // Lost the race for this row
                continue;
            }

            let kind = TopicKind::from_str(&kind_str);
            let payload = serde_json::from_str(&payload_str).ok();
            let (Some(kind), Some(payload)) = (kind, payload) else {
                conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
                logger::warning(
                    LogTag::Queue,
                    &format!("Dropped undecodable outbox entry {} (kind={})", id, kind_str),
                );
                continue;
            };

            return Ok(Some(OutboxItem {
                id,
                message: BroadcastMessage {
                    kind,
                    topic_key,
                    payload,
                    timestamp: enqueued_at,
                },
                receive_count: receive_count + 1,
            }));
        }
    }

    /// Remove a settled entry
    pub async fn ack_outbox(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.get_write_connection()?;
        conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Total entries, visible or in flight
    pub async fn outbox_depth(&self) -> Result<i64, StoreError> {
        let conn = self.get_read_connection()?;
        let depth = conn.query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))?;
        Ok(depth)
    }
}
