//! # Simulated Radio
//!
//! Host-build stand-in for the vendor stack. It behaves like the real
//! stack at the port boundary: signals and completions are queued and only
//! delivered from `poll`, TSNs are 8-bit and wrap, and a successful start
//! asks the adapter whether to form a network.
//!
//! A [`SimulatedRadioControl`] handle scripts the peer side: device
//! announcements, leaves, send completions and attribute reports.

use crate::domain::command::ZclCommand;
use crate::ports::radio::{
    RadioCallbacks, RadioConfig, RadioError, RadioReport, RadioSignal, RadioStack, RadioStatus,
    SignalAction, STATUS_OK,
};
use parking_lot::Mutex;
use shared_types::{AttributeId, ClusterId, Endpoint, Eui64, NetAddr, Tsn};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// PAN id the simulator picks when asked to choose one.
pub const SIMULATED_PAN_ID: u16 = 0x1A62;

/// A command the adapter handed to the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub tsn: Tsn,
    pub destination: NetAddr,
    pub endpoint: Endpoint,
    pub command: ZclCommand,
}

#[derive(Debug, Clone)]
enum SimEvent {
    Signal(RadioSignal),
    SendStatus {
        tsn: Tsn,
        status: RadioStatus,
    },
    Report {
        source: NetAddr,
        endpoint: Endpoint,
        cluster: ClusterId,
        attribute: AttributeId,
        data_type: u8,
        value: Vec<u8>,
    },
}

#[derive(Debug)]
struct SimState {
    config: Option<RadioConfig>,
    started: bool,
    first_start: bool,
    start_status: RadioStatus,
    formation_status: RadioStatus,
    next_tsn: Tsn,
    auto_ack: Option<RadioStatus>,
    reject_sends: Option<RadioStatus>,
    permit_join: u8,
    inbox: VecDeque<SimEvent>,
    sent: Vec<SentFrame>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            config: None,
            started: false,
            first_start: true,
            start_status: STATUS_OK,
            formation_status: STATUS_OK,
            next_tsn: 0,
            auto_ack: None,
            reject_sends: None,
            permit_join: 0,
            inbox: VecDeque::new(),
            sent: Vec::new(),
        }
    }
}

/// In-process radio stack.
#[derive(Debug, Default)]
pub struct SimulatedRadio {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRadio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for scripting the simulated network.
    #[must_use]
    pub fn control(&self) -> SimulatedRadioControl {
        SimulatedRadioControl {
            state: Arc::clone(&self.state),
        }
    }

    fn next_event(&self) -> Option<SimEvent> {
        self.state.lock().inbox.pop_front()
    }
}

impl RadioStack for SimulatedRadio {
    fn init(&mut self, config: RadioConfig) -> Result<(), RadioError> {
        self.state.lock().config = Some(config);
        debug!(pan_id = config.pan_id, channel = config.channel, "Simulated radio initialized");
        Ok(())
    }

    fn start(&mut self) -> Result<(), RadioError> {
        let mut state = self.state.lock();
        let status = state.start_status;
        state.started = status == STATUS_OK;
        let first_start = state.first_start;
        state.first_start = false;
        state.inbox.push_back(SimEvent::Signal(RadioSignal::StackStarted {
            first_start,
            status,
        }));
        Ok(())
    }

    fn poll(&mut self, callbacks: &dyn RadioCallbacks) -> usize {
        let mut delivered = 0;
        // The state lock is never held across a callback.
        while let Some(event) = self.next_event() {
            match event {
                SimEvent::Signal(signal) => {
                    if callbacks.on_signal(signal) == SignalAction::StartFormation {
                        let mut state = self.state.lock();
                        let config = state.config.unwrap_or(RadioConfig {
                            pan_id: 0xFFFF,
                            channel: 15,
                            max_children: 0,
                        });
                        let pan_id = if config.pan_id == 0xFFFF {
                            SIMULATED_PAN_ID
                        } else {
                            config.pan_id
                        };
                        let status = state.formation_status;
                        state.inbox.push_back(SimEvent::Signal(RadioSignal::Formation {
                            status,
                            pan_id,
                            channel: config.channel,
                        }));
                    }
                }
                SimEvent::SendStatus { tsn, status } => callbacks.on_send_status(tsn, status),
                SimEvent::Report {
                    source,
                    endpoint,
                    cluster,
                    attribute,
                    data_type,
                    value,
                } => callbacks.on_attribute_report(&RadioReport {
                    source,
                    endpoint,
                    cluster,
                    attribute,
                    data_type,
                    value: &value,
                }),
            }
            delivered += 1;
        }
        delivered
    }

    fn open_network(&mut self, seconds: u8) -> Result<(), RadioError> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(RadioError::NotStarted);
        }
        state.permit_join = seconds;
        state
            .inbox
            .push_back(SimEvent::Signal(RadioSignal::PermitJoinStatus { seconds }));
        Ok(())
    }

    fn send(
        &mut self,
        destination: NetAddr,
        endpoint: Endpoint,
        command: &ZclCommand,
    ) -> Result<Tsn, RadioError> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(RadioError::NotStarted);
        }
        if let Some(status) = state.reject_sends {
            return Err(RadioError::Rejected(status));
        }
        let tsn = state.next_tsn;
        state.next_tsn = tsn.wrapping_add(1);
        state.sent.push(SentFrame {
            tsn,
            destination,
            endpoint,
            command: command.clone(),
        });
        if let Some(status) = state.auto_ack {
            state.inbox.push_back(SimEvent::SendStatus { tsn, status });
        }
        Ok(tsn)
    }
}

/// Scripting handle for a [`SimulatedRadio`].
#[derive(Debug, Clone)]
pub struct SimulatedRadioControl {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRadioControl {
    fn push(&self, event: SimEvent) {
        self.state.lock().inbox.push_back(event);
    }

    pub fn inject_signal(&self, signal: RadioSignal) {
        self.push(SimEvent::Signal(signal));
    }

    /// A device (re)joins and announces itself.
    pub fn announce(&self, identity: Eui64, net_addr: NetAddr) {
        self.inject_signal(RadioSignal::DeviceAnnounce { identity, net_addr });
    }

    pub fn leave(&self, identity: Eui64) {
        self.inject_signal(RadioSignal::LeaveIndication { identity });
    }

    /// Delivers a send-status completion for `tsn` on the next poll.
    pub fn complete(&self, tsn: Tsn, status: RadioStatus) {
        self.push(SimEvent::SendStatus { tsn, status });
    }

    pub fn report(
        &self,
        source: NetAddr,
        endpoint: Endpoint,
        cluster: ClusterId,
        attribute: AttributeId,
        data_type: u8,
        value: &[u8],
    ) {
        self.push(SimEvent::Report {
            source,
            endpoint,
            cluster,
            attribute,
            data_type,
            value: value.to_vec(),
        });
    }

    /// Automatically complete every send with `status`.
    pub fn set_auto_ack(&self, status: Option<RadioStatus>) {
        self.state.lock().auto_ack = status;
    }

    /// Status the next `start` reports.
    pub fn set_start_status(&self, status: RadioStatus) {
        self.state.lock().start_status = status;
    }

    /// Status network formation reports.
    pub fn set_formation_status(&self, status: RadioStatus) {
        self.state.lock().formation_status = status;
    }

    /// Make every send fail synchronously with `status`.
    pub fn reject_sends(&self, status: Option<RadioStatus>) {
        self.state.lock().reject_sends = status;
    }

    pub fn set_next_tsn(&self, tsn: Tsn) {
        self.state.lock().next_tsn = tsn;
    }

    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.state.lock().sent.clone()
    }

    pub fn last_sent(&self) -> Option<SentFrame> {
        self.state.lock().sent.last().cloned()
    }

    pub fn permit_join(&self) -> u8 {
        self.state.lock().permit_join
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Events queued for the next poll.
    pub fn queued(&self) -> usize {
        self.state.lock().inbox.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        signals: StdMutex<Vec<RadioSignal>>,
        statuses: StdMutex<Vec<(Tsn, RadioStatus)>>,
        reports: StdMutex<Vec<(NetAddr, Vec<u8>)>>,
    }

    impl RadioCallbacks for Recorder {
        fn on_signal(&self, signal: RadioSignal) -> SignalAction {
            self.signals.lock().unwrap().push(signal);
            match signal {
                RadioSignal::StackStarted { status: STATUS_OK, .. } => SignalAction::StartFormation,
                _ => SignalAction::None,
            }
        }

        fn on_send_status(&self, tsn: Tsn, status: RadioStatus) {
            self.statuses.lock().unwrap().push((tsn, status));
        }

        fn on_attribute_report(&self, report: &RadioReport<'_>) {
            self.reports
                .lock()
                .unwrap()
                .push((report.source, report.value.to_vec()));
        }
    }

    fn started() -> (SimulatedRadio, Recorder) {
        let mut radio = SimulatedRadio::new();
        radio
            .init(RadioConfig {
                pan_id: 0xFFFF,
                channel: 20,
                max_children: 64,
            })
            .unwrap();
        radio.start().unwrap();
        let recorder = Recorder::default();
        radio.poll(&recorder);
        (radio, recorder)
    }

    #[test]
    fn test_start_then_formation_in_one_poll() {
        let (_radio, recorder) = started();
        let signals = recorder.signals.lock().unwrap();
        assert_eq!(
            *signals,
            vec![
                RadioSignal::StackStarted {
                    first_start: true,
                    status: STATUS_OK
                },
                RadioSignal::Formation {
                    status: STATUS_OK,
                    pan_id: SIMULATED_PAN_ID,
                    channel: 20
                },
            ]
        );
    }

    #[test]
    fn test_tsn_wraps() {
        let (mut radio, _) = started();
        radio.control().set_next_tsn(255);
        let command = ZclCommand::OnOff { on: true };
        assert_eq!(radio.send(NetAddr(1), 1, &command), Ok(255));
        assert_eq!(radio.send(NetAddr(1), 1, &command), Ok(0));
        assert_eq!(radio.control().sent_frames().len(), 2);
    }

    #[test]
    fn test_send_requires_start() {
        let mut radio = SimulatedRadio::new();
        assert_eq!(
            radio.send(NetAddr(1), 1, &ZclCommand::OnOff { on: false }),
            Err(RadioError::NotStarted)
        );
    }

    #[test]
    fn test_auto_ack_delivered_on_next_poll() {
        let (mut radio, recorder) = started();
        let control = radio.control();
        control.set_auto_ack(Some(STATUS_OK));
        let tsn = radio
            .send(NetAddr(2), 1, &ZclCommand::OnOff { on: true })
            .unwrap();
        assert!(recorder.statuses.lock().unwrap().is_empty());
        assert_eq!(radio.poll(&recorder), 1);
        assert_eq!(*recorder.statuses.lock().unwrap(), vec![(tsn, STATUS_OK)]);
    }

    #[test]
    fn test_scripted_report() {
        let (mut radio, recorder) = started();
        radio.control().report(NetAddr(9), 1, 0x0402, 0, 0x29, &[0x10, 0x09]);
        radio.poll(&recorder);
        assert_eq!(
            *recorder.reports.lock().unwrap(),
            vec![(NetAddr(9), vec![0x10, 0x09])]
        );
    }
}
