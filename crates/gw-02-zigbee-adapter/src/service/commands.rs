//! Command surface.
//!
//! Every send follows the same protocol:
//!
//! 1. reject unless `Ready`;
//! 2. resolve the network address, or `DeviceNotFound`;
//! 3. reserve a pending slot for a non-zero correlation id, or `PendingFull`;
//! 4. send under the radio lock and attach the returned TSN before the
//!    lock is released, so a completion can never outrun the attach.
//!
//! A synchronous radio rejection frees the slot again.

use super::adapter::ZigbeeAdapter;
use crate::domain::{ReportingConfig, ZclCommand, ZigbeeError};
use crate::ports::RadioStack;
use shared_types::limits::MAX_PERMIT_JOIN_S;
use shared_types::{AttributeId, ClusterId, CorrelationId, Endpoint, Eui64, Tsn};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl<R: RadioStack> ZigbeeAdapter<R> {
    /// Opens the network for joining for `seconds` (0 closes it).
    ///
    /// # Errors
    ///
    /// `NotReady` unless `Ready`; `InvalidArgument` above 254 seconds.
    pub fn set_permit_join(&self, seconds: u16) -> Result<(), ZigbeeError> {
        self.core.ensure_ready()?;
        let seconds = u8::try_from(seconds)
            .ok()
            .filter(|s| *s <= MAX_PERMIT_JOIN_S)
            .ok_or_else(|| {
                ZigbeeError::InvalidArgument(format!(
                    "permit join {seconds}s exceeds {MAX_PERMIT_JOIN_S}s"
                ))
            })?;
        self.radio
            .lock()
            .open_network(seconds)
            .map_err(|err| ZigbeeError::Radio(err.to_string()))?;
        info!(seconds, "Permit join requested");
        Ok(())
    }

    pub fn send_onoff(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        on: bool,
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        self.core.ensure_ready()?;
        self.send_command(identity, endpoint, ZclCommand::OnOff { on }, correlation_id)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for a level above 254.
    pub fn send_level(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        level: u8,
        transition_ds: u16,
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        self.core.ensure_ready()?;
        let command = ZclCommand::move_to_level(level, transition_ds)?;
        self.send_command(identity, endpoint, command, correlation_id)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for an empty list or more than 8 attributes.
    pub fn read_attributes(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        cluster: ClusterId,
        attributes: &[AttributeId],
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        self.core.ensure_ready()?;
        let command = ZclCommand::read_attributes(cluster, attributes)?;
        self.send_command(identity, endpoint, command, correlation_id)
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `min_interval > max_interval`.
    pub fn configure_reporting(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        config: ReportingConfig,
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        self.core.ensure_ready()?;
        let command = ZclCommand::configure_reporting(config)?;
        self.send_command(identity, endpoint, command, correlation_id)
    }

    /// Binds `cluster` on the device's `endpoint` to the coordinator.
    pub fn bind(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        cluster: ClusterId,
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        self.core.ensure_ready()?;
        self.send_command(identity, endpoint, ZclCommand::Bind { cluster }, correlation_id)
    }

    fn send_command(
        &self,
        identity: Eui64,
        endpoint: Endpoint,
        command: ZclCommand,
        correlation_id: CorrelationId,
    ) -> Result<Tsn, ZigbeeError> {
        let entry = self
            .core
            .cache
            .lock()
            .find_by_identity(identity)
            .ok_or(ZigbeeError::DeviceNotFound(identity))?;

        let slot = if correlation_id.is_none() {
            None
        } else {
            let slot = self.core.pending.lock().allocate(
                correlation_id,
                command.cluster(),
                command.command_id(),
                self.core.now(),
            )?;
            Some(slot)
        };

        let sent = {
            let mut radio = self.radio.lock();
            let sent = radio.send(entry.net_addr, endpoint, &command);
            if let (Ok(tsn), Some(slot)) = (&sent, slot) {
                self.core.pending.lock().attach(slot, *tsn);
            }
            sent
        };

        match sent {
            Ok(tsn) => {
                self.core
                    .counters
                    .commands_sent
                    .fetch_add(1, Ordering::Relaxed);
                debug!(
                    command = command.name(),
                    identity = %identity,
                    net_addr = %entry.net_addr,
                    endpoint,
                    tsn,
                    correlation_id = %correlation_id,
                    "Command sent"
                );
                Ok(tsn)
            }
            Err(err) => {
                if let Some(slot) = slot {
                    self.core.pending.lock().free(slot);
                }
                warn!(
                    command = command.name(),
                    identity = %identity,
                    error = %err,
                    "Command rejected by radio"
                );
                Err(ZigbeeError::Radio(err.to_string()))
            }
        }
    }
}
