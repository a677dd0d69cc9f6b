/// Fallback wrapper around two broadcast engines
///
/// Publishes go to the primary engine; if it returns an error the
/// message is handed to the secondary one instead, so a wedged actor
/// mailbox degrades to queued delivery rather than a lost update.
use super::Broadcaster;
use crate::core::{BroadcastMessage, GateResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::sync::Arc;

pub struct FallbackBroadcaster {
    primary: Arc<dyn Broadcaster>,
    secondary: Arc<dyn Broadcaster>,
}

impl FallbackBroadcaster {
    pub fn new(primary: Arc<dyn Broadcaster>, secondary: Arc<dyn Broadcaster>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Broadcaster for FallbackBroadcaster {
    async fn publish(&self, message: BroadcastMessage) -> GateResult<()> {
        match self.primary.publish(message.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                logger::warning(
                    LogTag::Fanout,
                    &format!(
                        "{} engine failed ({}), retrying via {}",
                        self.primary.engine_name(),
                        e,
                        self.secondary.engine_name()
                    ),
                );
                self.secondary.publish(message).await
            }
        }
    }

    fn engine_name(&self) -> &'static str {
        self.primary.engine_name()
    }
}
