//! Discord notifier.
//!
//! The bot surface is a supervised background task fed by a bounded queue.
//! Handlers never talk to Discord directly; they push a `TicketNotification`
//! and move on. A send failure is logged and the task keeps draining the
//! queue. Without a token and channel the server gets a `NoopNotifier` and
//! the whole surface reports itself as disabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::models::Ticket;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const QUEUE_DEPTH: usize = 64;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// What the notifier announces. Only creation is pushed today; the enum
/// keeps the queue payload open for status-change announcements.
#[derive(Debug)]
pub enum TicketNotification {
    Created(Ticket),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TicketNotification) -> anyhow::Result<()>;
    fn is_enabled(&self) -> bool;
}

/// Stands in when no bot token or channel is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &TicketNotification) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Posts ticket announcements to one Discord channel over the REST API.
pub struct DiscordNotifier {
    bot_token: String,
    channel_id: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MessagePayload {
    content: String,
}

impl DiscordNotifier {
    pub fn new(bot_token: String, channel_id: String) -> Self {
        Self::with_api_base(bot_token, channel_id, DISCORD_API_BASE.to_string())
    }

    fn with_api_base(bot_token: String, channel_id: String, api_base: String) -> Self {
        Self {
            bot_token,
            channel_id,
            api_base,
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    fn render(event: &TicketNotification) -> String {
        match event {
            TicketNotification::Created(ticket) => format!(
                "🎫 New ticket **{}**: {} [{} / {}] in project {}",
                ticket.id, ticket.title, ticket.priority, ticket.kind, ticket.project_id
            ),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, event: &TicketNotification) -> anyhow::Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&MessagePayload {
                content: Self::render(event),
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord message post failed with status {}: {}", status, detail);
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Pick the notifier for the given credentials.
pub fn notifier_from_credentials(
    bot_token: Option<String>,
    channel_id: Option<String>,
) -> Box<dyn Notifier> {
    match (bot_token, channel_id) {
        (Some(token), Some(channel)) if !token.is_empty() && !channel.is_empty() => {
            Box::new(DiscordNotifier::new(token, channel))
        }
        _ => {
            info!("Discord bot disabled: no token or channel configured");
            Box::new(NoopNotifier)
        }
    }
}

/// Cheap clone handed to request handlers: enqueue-only access to the task.
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<TicketNotification>,
    enabled: bool,
}

impl NotifierHandle {
    /// Queue an announcement. Dropped (with a log line) when the queue is
    /// full or the task is gone; ticket writes never block on Discord.
    pub fn enqueue(&self, event: TicketNotification) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropping notification: {}", e);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Supervised wrapper around a running notifier.
///
/// `spawn` starts the drain loop; `shutdown` closes the queue and waits for
/// it to finish the messages already accepted.
pub struct NotifierTask {
    tx: mpsc::Sender<TicketNotification>,
    stop_tx: tokio::sync::oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
    enabled: bool,
}

impl NotifierTask {
    pub fn spawn(notifier: Box<dyn Notifier>) -> Self {
        let enabled = notifier.is_enabled();
        let (tx, mut rx) = mpsc::channel::<TicketNotification>(QUEUE_DEPTH);
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(event) => {
                            if let Err(e) = notifier.notify(&event).await {
                                error!("Notification failed: {:#}", e);
                            }
                        }
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        // Finish what was already queued, then stop.
                        while let Ok(event) = rx.try_recv() {
                            if let Err(e) = notifier.notify(&event).await {
                                error!("Notification failed: {:#}", e);
                            }
                        }
                        break;
                    }
                }
            }
            info!("Notifier task stopped");
        });
        Self {
            tx,
            stop_tx,
            handle,
            enabled,
        }
    }

    pub fn handle(&self) -> NotifierHandle {
        NotifierHandle {
            tx: self.tx.clone(),
            enabled: self.enabled,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(());
        drop(self.tx);
        if let Err(e) = self.handle.await {
            error!("Notifier task panicked: {}", e);
        }
    }
}
