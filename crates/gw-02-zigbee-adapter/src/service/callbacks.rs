//! Radio callbacks.
//!
//! These run on the radio thread inside `RadioStack::poll`. They never
//! block on anything but the table locks, never fail, and hand every
//! result to the bus.

use super::adapter::AdapterCore;
use crate::domain::{AdapterState, Upsert};
use crate::ports::{RadioCallbacks, RadioReport, RadioSignal, RadioStatus, SignalAction, STATUS_OK};
use shared_bus::{
    AttributeReport, CommandConfirmed, CommandFailed, DeviceAddress, DeviceLeft, Envelope,
    EventType, PermitJoinChanged,
};
use shared_types::{ticks_elapsed, ticks_to_ms, Eui64, NetAddr, Tsn};
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

impl AdapterCore {
    fn on_stack_started(&self, first_start: bool, status: RadioStatus) -> SignalAction {
        if status != STATUS_OK {
            error!(status, "Radio stack start failed");
            self.fail("radio stack start failed");
            return SignalAction::None;
        }
        if self.lifecycle.state() != AdapterState::Initializing {
            debug!(first_start, "Stack start signal outside initialization");
            return SignalAction::None;
        }
        info!(
            "Network {}",
            if first_start { "starting" } else { "restored" }
        );
        SignalAction::StartFormation
    }

    fn on_formation(&self, status: RadioStatus, pan_id: u16, channel: u8) {
        if status != STATUS_OK {
            error!(status, "Network formation failed");
            self.fail("network formation failed");
            return;
        }
        if self.lifecycle.transition(AdapterState::Ready).is_ok() {
            let elapsed = ticks_elapsed(self.init_tick.load(Ordering::Relaxed), self.now());
            info!(
                formation_ms = ticks_to_ms(elapsed),
                pan_id = format_args!("0x{pan_id:04X}"),
                channel,
                "Network formed"
            );
            self.publish(Envelope::new(EventType::NETWORK_UP));
        }
    }

    fn on_device_announce(&self, identity: Eui64, net_addr: NetAddr) {
        let payload = DeviceAddress { identity, net_addr };
        let upsert = self.cache.lock().insert(identity, net_addr);
        match upsert {
            Ok(Upsert::Inserted(_)) => {
                info!(identity = %identity, net_addr = %net_addr, "Device joined");
                self.emit(EventType::DEVICE_JOINED, &payload);
            }
            Ok(Upsert::Updated { previous, .. }) if previous != net_addr => {
                debug!(
                    identity = %identity,
                    from = %previous,
                    to = %net_addr,
                    "Device readdressed"
                );
            }
            Ok(Upsert::Updated { .. }) => {}
            Err(err) => {
                warn!(identity = %identity, error = %err, "Device not cached");
            }
        }
        debug!(identity = %identity, net_addr = %net_addr, "Device announce");
        self.emit(EventType::DEVICE_ANNOUNCED, &payload);
    }

    fn on_leave(&self, identity: Eui64) {
        let removed = self.cache.lock().remove(identity);
        info!(identity = %identity, cached = removed.is_some(), "Device left");
        self.emit(EventType::DEVICE_LEFT, &DeviceLeft { identity });
    }
}

impl RadioCallbacks for AdapterCore {
    fn on_signal(&self, signal: RadioSignal) -> SignalAction {
        match signal {
            RadioSignal::StackStarted {
                first_start,
                status,
            } => return self.on_stack_started(first_start, status),
            RadioSignal::Formation {
                status,
                pan_id,
                channel,
            } => self.on_formation(status, pan_id, channel),
            RadioSignal::DeviceAnnounce { identity, net_addr } => {
                self.on_device_announce(identity, net_addr);
            }
            RadioSignal::LeaveIndication { identity } => self.on_leave(identity),
            RadioSignal::PermitJoinStatus { seconds } => {
                info!(seconds, "Permit join {}", if seconds > 0 { "on" } else { "off" });
                self.emit(EventType::PERMIT_JOIN_CHANGED, &PermitJoinChanged { seconds });
            }
            RadioSignal::Other { code, status } => debug!(code, status, "Radio signal"),
        }
        SignalAction::None
    }

    fn on_send_status(&self, tsn: Tsn, status: RadioStatus) {
        let Some(command) = self.pending.lock().complete(tsn) else {
            trace!(tsn, status, "Send status for unknown TSN");
            return;
        };
        let correlation_id = command.correlation_id;
        let rtt = ticks_elapsed(command.issued_at, self.now());
        info!(
            correlation_id = %correlation_id,
            rtt_ms = ticks_to_ms(rtt),
            status,
            "Command round trip"
        );
        if status == STATUS_OK {
            self.counters
                .commands_confirmed
                .fetch_add(1, Ordering::Relaxed);
            self.emit_correlated(
                EventType::COMMAND_CONFIRMED,
                correlation_id,
                &CommandConfirmed {
                    correlation_id,
                    status,
                },
            );
        } else {
            self.counters.commands_failed.fetch_add(1, Ordering::Relaxed);
            self.emit_correlated(
                EventType::COMMAND_FAILED,
                correlation_id,
                &CommandFailed {
                    correlation_id,
                    error_code: status,
                },
            );
        }
    }

    fn on_attribute_report(&self, report: &RadioReport<'_>) {
        let Some(entry) = self.cache.lock().find_by_net_addr(report.source) else {
            self.counters.reports_unknown.fetch_add(1, Ordering::Relaxed);
            trace!(
                net_addr = %report.source,
                cluster = report.cluster,
                "Report from unknown address"
            );
            return;
        };
        debug!(
            identity = %entry.identity,
            cluster = format_args!("0x{:04X}", report.cluster),
            attribute = format_args!("0x{:04X}", report.attribute),
            "Attribute report"
        );
        self.counters.reports_forwarded.fetch_add(1, Ordering::Relaxed);
        self.emit(
            EventType::ATTRIBUTE_REPORT,
            &AttributeReport::new(
                entry.identity,
                report.endpoint,
                report.cluster,
                report.attribute,
                report.data_type,
                report.value,
            ),
        );
    }
}
