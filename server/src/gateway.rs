//! Request-level facade over the ledger and the registry.

use crate::error::{GatewayError, GatewayResult};
use crate::notify::NotificationSink;
use hwgate_license::{
    ActivityRegistry, ActivityStatus, AuthorizationLedger, AuthorizationRecord, Listing, Snapshot,
    VerifyOutcome,
};
use hwgate_types::{HardwareId, InstanceId};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Shared administrative secret for authorize and revoke.
    pub admin_key: String,
    /// Grant length when the caller does not give one.
    pub default_validity_days: i64,
    /// Upper bound on each notification delivery.
    pub notify_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            admin_key: String::new(),
            default_validity_days: 30,
            notify_timeout: Duration::from_secs(5),
        }
    }
}

/// Validates requests, gates admin operations, and dispatches to the
/// ledger and registry. Successful mutations are announced on the
/// notification sink without waiting for delivery.
pub struct Gateway {
    ledger: Arc<AuthorizationLedger>,
    registry: Arc<ActivityRegistry>,
    sink: Arc<dyn NotificationSink>,
    admin_digest: Vec<u8>,
    default_validity_days: i64,
    notify_timeout: Duration,
}

impl Gateway {
    pub fn new(
        ledger: Arc<AuthorizationLedger>,
        registry: Arc<ActivityRegistry>,
        sink: Arc<dyn NotificationSink>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            ledger,
            registry,
            sink,
            admin_digest: Sha256::digest(config.admin_key.as_bytes()).to_vec(),
            default_validity_days: config.default_validity_days,
            notify_timeout: config.notify_timeout,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<AuthorizationLedger> {
        &self.ledger
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ActivityRegistry> {
        &self.registry
    }

    /// Registers first contact from an instance.
    pub async fn submit_identity(&self, hardware_id: &str, instance_id: &str) -> GatewayResult<()> {
        let hardware_id = HardwareId::parse(hardware_id)?;
        let instance_id = InstanceId::parse(instance_id)?;

        self.registry.heartbeat(&hardware_id, &instance_id);
        info!("Identity submitted: {} ({})", hardware_id, instance_id);
        self.notify(format!(
            "Hardware id {hardware_id} checked in from instance {instance_id}"
        ));
        Ok(())
    }

    /// Grants `hardware_id` access for `validity_days` (or the configured
    /// default) starting today.
    pub async fn authorize(
        &self,
        hardware_id: &str,
        admin_key: &str,
        validity_days: Option<i64>,
    ) -> GatewayResult<AuthorizationRecord> {
        self.check_admin(admin_key)?;
        let hardware_id = HardwareId::parse(hardware_id)?;
        let days = validity_days.unwrap_or(self.default_validity_days);

        let record = self.ledger.authorize(&hardware_id, days).await?;
        self.notify(format!(
            "Hardware id {} authorized until {}",
            hardware_id,
            record.expiration_date()
        ));
        Ok(record)
    }

    /// Removes the grant for `hardware_id`. Returns whether one existed.
    pub async fn revoke(&self, hardware_id: &str, admin_key: &str) -> GatewayResult<bool> {
        self.check_admin(admin_key)?;
        let hardware_id = HardwareId::parse(hardware_id)?;

        let removed = self.ledger.revoke(&hardware_id).await?;
        if removed {
            self.notify(format!("Hardware id {hardware_id} revoked"));
        }
        Ok(removed)
    }

    /// Checks the entitlement of `hardware_id`. An authorized check that
    /// names an instance also counts as that instance's heartbeat.
    pub async fn verify(
        &self,
        hardware_id: &str,
        instance_id: Option<&str>,
    ) -> GatewayResult<VerifyOutcome> {
        let hardware_id = HardwareId::parse(hardware_id)?;
        let instance_id = instance_id.map(InstanceId::parse).transpose()?;

        let outcome = self.ledger.verify(&hardware_id).await?;
        if outcome.is_authorized() {
            if let Some(instance_id) = &instance_id {
                self.registry.heartbeat(&hardware_id, instance_id);
            }
        }
        Ok(outcome)
    }

    /// Forwards a liveness report. `status` is `active` or `inactive`.
    pub async fn report_activity(
        &self,
        hardware_id: &str,
        instance_id: &str,
        status: &str,
    ) -> GatewayResult<()> {
        let hardware_id = HardwareId::parse(hardware_id)?;
        let instance_id = InstanceId::parse(instance_id)?;
        let status: ActivityStatus = status.parse().map_err(GatewayError::Validation)?;

        self.registry
            .report_activity(&hardware_id, &instance_id, status);
        debug!("{} / {} reported {}", hardware_id, instance_id, status);
        Ok(())
    }

    pub async fn list_authorized(&self) -> GatewayResult<Listing> {
        Ok(self.ledger.list().await?)
    }

    /// Liveness of every tracked hardware id. Prunes stale instances.
    pub async fn list_active(&self) -> GatewayResult<Snapshot> {
        Ok(self.registry.snapshot())
    }

    fn check_admin(&self, presented: &str) -> GatewayResult<()> {
        let digest = Sha256::digest(presented.as_bytes());
        let diff = digest
            .iter()
            .zip(&self.admin_digest)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff != 0 {
            warn!("Rejected admin request: wrong key");
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    /// Hands `message` to the sink on a separate task.
    fn notify(&self, message: String) {
        let sink = Arc::clone(&self.sink);
        let limit = self.notify_timeout;
        tokio::spawn(async move {
            match timeout(limit, sink.emit(&message)).await {
                Ok(Ok(())) => debug!("Notification sent via {}", sink.name()),
                Ok(Err(e)) => debug!("Notification via {} failed: {}", sink.name(), e),
                Err(_) => debug!("Notification via {} timed out after {:?}", sink.name(), limit),
            }
        });
    }
}
