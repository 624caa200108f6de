//! Recording emergency notifier for the CLI demo and integration tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::tools::{EmergencyNotification, EmergencyNotifier, ToolError};

/// Records notifications instead of delivering them, so tests and the demo
/// can assert exactly what left the system.
#[derive(Default)]
pub struct RecordingEmergencyNotifier {
    notifications: RwLock<Vec<EmergencyNotification>>,
}

impl RecordingEmergencyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything notified so far.
    pub async fn recorded(&self) -> Vec<EmergencyNotification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait]
impl EmergencyNotifier for RecordingEmergencyNotifier {
    async fn notify(&self, notification: EmergencyNotification) -> Result<String, ToolError> {
        let ack = format!(
            "emergency team notified for {} in {}",
            notification.tracking_number, notification.general_area
        );
        self.notifications.write().await.push(notification);
        Ok(ack)
    }
}
