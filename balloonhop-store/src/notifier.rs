use async_trait::async_trait;
use tracing::info;

use balloonhop_core::notify::{NotifyError, NotifyOutcome, NotifyPassengers, Notifier};
use balloonhop_shared::Masked;

/// Records the fan-out in the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    sms_configured: bool,
}

impl LogNotifier {
    pub fn new(sms_configured: bool) -> Self {
        Self { sms_configured }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_passengers(&self, request: NotifyPassengers) -> Result<NotifyOutcome, NotifyError> {
        for phone in &request.phone_numbers {
            info!(to = %Masked(phone.as_str()), sms_configured = self.sms_configured, "SMS notification queued");
        }
        info!(
            phones = request.phone_numbers.len(),
            devices = request.device_tokens.len(),
            deep_link = request.deep_link_url.as_deref().unwrap_or(""),
            message = %request.message,
            "Passenger notification"
        );
        Ok(NotifyOutcome {
            sent: true,
            count: request.recipients(),
        })
    }
}
