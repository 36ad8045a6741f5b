use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct NotifyPassengers {
    pub phone_numbers: Vec<String>,
    pub device_tokens: Vec<String>,
    pub message: String,
    pub deep_link_url: Option<String>,
}

impl NotifyPassengers {
    pub fn recipients(&self) -> usize {
        self.phone_numbers.len() + self.device_tokens.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyOutcome {
    pub sent: bool,
    pub count: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// SMS / push fan-out to passengers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_passengers(&self, request: NotifyPassengers) -> Result<NotifyOutcome, NotifyError>;
}
