use std::sync::Arc;

use poise::serenity_prelude::{ChannelId, CreateMessage, Http, UserId, async_trait};

/// Where an asynchronous notice goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotifyTarget {
    Channel(ChannelId),
    /// Direct message.
    User(UserId),
}

/// The only way the core talks back to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: NotifyTarget, message: String);
}

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, target: NotifyTarget, message: String) {
        let builder = CreateMessage::new().content(message);
        let res = match target {
            NotifyTarget::Channel(ch) => ch.send_message(&self.http, builder).await.map(|_| ()),
            NotifyTarget::User(uid) => match uid.create_dm_channel(&self.http).await {
                Ok(dm) => dm.id.send_message(&self.http, builder).await.map(|_| ()),
                Err(e) => Err(e),
            },
        };
        if let Err(e) = res {
            tracing::warn!(?target, error = %e, "failed to deliver notification");
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every notification for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(NotifyTarget, String)>>,
    }

    impl RecordingNotifier {
        pub async fn messages(&self) -> Vec<(NotifyTarget, String)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, target: NotifyTarget, message: String) {
            self.sent.lock().await.push((target, message));
        }
    }
}
