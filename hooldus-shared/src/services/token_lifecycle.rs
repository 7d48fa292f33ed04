use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use crate::repositories::device_repository::DeviceRepository;

/// Removes registrations the provider reported as permanently invalid.
pub struct TokenLifecycleManager {
    devices: Arc<dyn DeviceRepository>,
}

impl TokenLifecycleManager {
    pub fn new(devices: Arc<dyn DeviceRepository>) -> Self {
        Self { devices }
    }

    /// Deletes every record holding one of `invalid_tokens` and returns how many went.
    ///
    /// Tokens already gone count as zero. A store error on one token is logged
    /// and the rest are still attempted.
    pub async fn prune(&self, invalid_tokens: &[String]) -> usize {
        let unique: BTreeSet<&str> = invalid_tokens.iter().map(String::as_str).collect();
        let mut removed = 0;

        for token in unique {
            match self.devices.delete_by_token(token).await {
                Ok(count) => removed += count,
                Err(e) => warn!(error = %e, "Failed to prune device token"),
            }
        }

        info!(requested = invalid_tokens.len(), removed, "Pruned invalid device tokens");
        removed
    }
}
