//! Integration tests for pin switching, schedules and configuration requests.

use rf_switch_hub::config::{DeviceConfig, HubConfig, LinkConfig, PinConfig};
use rf_switch_hub::hal::{MockClock, MockTransport, NullTransport, ReplyFault};
use rf_switch_hub::{
    ConfigRequest, ControlHub, HubError, LinkError, Pin, PinKind, PinState, RadioLink,
    RequestError, Schedule, StateChange, TimeOfDay,
};

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn link(radio: MockTransport) -> RadioLink<MockTransport, MockClock> {
    RadioLink::new(radio, MockClock::new(), LinkConfig::default())
}

fn hub(radio: MockTransport) -> ControlHub<MockTransport, MockClock> {
    let config = HubConfig::demo().with_device(
        DeviceConfig::new(5, "sensors")
            .with_pins(vec![PinConfig::new(7, PinKind::DigitalInput)]),
    );
    ControlHub::from_config(&config, radio, MockClock::new()).unwrap()
}

fn state_of(hub: &ControlHub<MockTransport, MockClock>, device: u8, pin: u8) -> PinState {
    hub.lookup(device).unwrap().pin(pin).unwrap().state()
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn toggle_sends_single_write() {
    let link = link(MockTransport::new());
    let mut pin = Pin::new(4, 3, PinKind::ToggleSwitch);

    assert_eq!(pin.set_state(PinState::On, &link), Ok(StateChange::Switched { attempts: 1 }));
    assert_eq!(pin.set_state(PinState::Off, &link), Ok(StateChange::Switched { attempts: 1 }));
    assert_eq!(
        link.with_transport(|r| r.written()),
        vec![[0, 4, 0xA4, 3, 1], [0, 4, 0xA4, 3, 0]]
    );
}

#[test]
fn momentary_pulses_in_both_directions() {
    let link = link(MockTransport::new());
    let mut pin = Pin::new(3, 2, PinKind::MomentarySwitch);

    pin.set_state(PinState::On, &link).unwrap();
    pin.set_state(PinState::Off, &link).unwrap();

    let bits: Vec<u8> = link
        .with_transport(|r| r.written_packets())
        .iter()
        .map(|p| p.arg2)
        .collect();
    assert_eq!(bits, vec![0, 1, 0, 0, 1, 0]);
    assert_eq!(pin.state(), PinState::Off);
}

#[test]
fn repeated_request_sends_nothing() {
    let link = link(MockTransport::new());
    let mut pin = Pin::new(3, 2, PinKind::MomentarySwitch);

    pin.set_state(PinState::On, &link).unwrap();
    assert_eq!(pin.set_state(PinState::On, &link), Ok(StateChange::Unchanged));
    assert_eq!(link.with_transport(|r| r.write_count()), 3);

    // Off is the initial state, so a fresh pin ignores Off
    let mut fresh = Pin::new(3, 3, PinKind::ToggleSwitch);
    assert_eq!(fresh.set_state(PinState::Off, &link), Ok(StateChange::Unchanged));
    assert_eq!(link.with_transport(|r| r.write_count()), 3);
}

#[test]
fn input_pins_reject_state_changes() {
    let link = link(MockTransport::new());
    for kind in [PinKind::DigitalInput, PinKind::AnalogInput] {
        let mut pin = Pin::new(5, 7, kind);
        // Rejected even when the state would not change
        for target in [PinState::On, PinState::Off] {
            assert_eq!(
                pin.set_state(target, &link),
                Err(HubError::UnsupportedOperation { device: 5, pin: 7, kind })
            );
        }
    }
    assert_eq!(link.with_transport(|r| r.write_count()), 0);
}

#[test]
fn failed_toggle_keeps_state() {
    let link = link(MockTransport::offline());
    let mut pin = Pin::new(4, 3, PinKind::ToggleSwitch);

    let err = pin.set_state(PinState::On, &link).unwrap_err();
    assert!(matches!(
        err,
        HubError::TransmissionFailed(LinkError::NotConfirmed { receiver: 4, attempts: 5, .. })
    ));
    assert_eq!(pin.state(), PinState::Off);
}

#[test]
fn half_confirmed_pulse_keeps_state() {
    let mut radio = MockTransport::new();
    radio.queue_faults(&[ReplyFault::Delay(0)]);
    radio.drop_next(5);
    let link = link(radio);
    let mut pin = Pin::new(3, 2, PinKind::MomentarySwitch);

    let err = pin.set_state(PinState::On, &link).unwrap_err();
    assert!(matches!(
        err,
        HubError::TransmissionFailed(LinkError::SequenceAborted { confirmed: 1, total: 3, .. })
    ));
    assert_eq!(pin.state(), PinState::Off);
}

// ============================================================================
// Schedules
// ============================================================================

#[test]
fn schedule_fires_on_exact_minutes() {
    let link = link(MockTransport::new());
    let mut pin = Pin::new(4, 3, PinKind::ToggleSwitch);
    pin.set_schedule(Some(Schedule::new(t("09:00"), t("09:05"))));

    assert_eq!(pin.refresh_schedule(t("09:00"), &link), Ok(Some(PinState::On)));
    assert_eq!(pin.state(), PinState::On);

    assert_eq!(pin.refresh_schedule(t("09:03"), &link), Ok(None));
    assert_eq!(pin.state(), PinState::On);

    assert_eq!(pin.refresh_schedule(t("09:05"), &link), Ok(Some(PinState::Off)));
    assert_eq!(pin.state(), PinState::Off);

    // Back at the on minute with the pin already on: nothing to do
    pin.set_state(PinState::On, &link).unwrap();
    let writes = link.with_transport(|r| r.write_count());
    assert_eq!(pin.refresh_schedule(t("09:00"), &link), Ok(None));
    assert_eq!(link.with_transport(|r| r.write_count()), writes);
}

#[test]
fn missed_minute_is_not_caught_up() {
    let link = link(MockTransport::new());
    let mut pin = Pin::new(4, 3, PinKind::ToggleSwitch);
    pin.set_schedule(Some(Schedule::new(t("09:00"), t("09:05"))));

    assert_eq!(pin.refresh_schedule(t("09:01"), &link), Ok(None));
    assert_eq!(pin.state(), PinState::Off);
    assert_eq!(link.with_transport(|r| r.write_count()), 0);
}

#[test]
fn scheduled_switch_failure_is_retried_next_tick() {
    let mut radio = MockTransport::new();
    radio.set_board_offline(4);
    let mut hub = hub(radio);
    hub.lookup_mut(4)
        .unwrap()
        .pin_mut(3)
        .unwrap()
        .set_schedule(Some(Schedule::new(t("09:00"), t("09:05"))));

    let events = hub.refresh_schedules(t("09:00"));
    assert_eq!(events.len(), 1);
    assert!(events[0].outcome.is_err());
    assert_eq!(state_of(&hub, 4, 3), PinState::Off);

    // Same minute, board back: the state still differs so it fires again
    hub.link().with_transport(|r| r.set_board_online(4));
    let events = hub.refresh_schedules(t("09:00"));
    assert_eq!(events[0].outcome, Ok(PinState::On));
    assert_eq!(state_of(&hub, 4, 3), PinState::On);
}

#[test]
fn refresh_visits_every_device() {
    let mut hub = hub(MockTransport::new());
    for device in [3, 4] {
        hub.lookup_mut(device)
            .unwrap()
            .pin_mut(3)
            .unwrap()
            .set_schedule(Some(Schedule::new(t("07:30"), t("08:00"))));
    }

    let events = hub.refresh_schedules(t("07:30"));
    let fired: Vec<(u8, u8)> = events.iter().map(|e| (e.device, e.pin)).collect();
    assert_eq!(fired, vec![(3, 3), (4, 3)]);
    assert_eq!(state_of(&hub, 3, 3), PinState::On);
    assert_eq!(state_of(&hub, 4, 3), PinState::On);
}

// ============================================================================
// No radio hardware
// ============================================================================

#[test]
fn hub_without_radio_degrades_to_failures() {
    let mut hub =
        ControlHub::from_config(&HubConfig::demo(), NullTransport::new(), MockClock::new()).unwrap();
    hub.link().begin().unwrap();

    let err = hub.set_pin_state(4, 3, PinState::On).unwrap_err();
    assert!(matches!(
        err,
        HubError::TransmissionFailed(LinkError::NotConfirmed { receiver: 4, attempts: 5, .. })
    ));
    assert_eq!(hub.lookup(4).unwrap().pin(3).unwrap().state(), PinState::Off);

    // Schedules keep being evaluated, every device gets its turn
    for device in [3, 4] {
        hub.lookup_mut(device)
            .unwrap()
            .pin_mut(3)
            .unwrap()
            .set_schedule(Some(Schedule::new(t("06:00"), t("06:30"))));
    }
    let events = hub.refresh_schedules(t("06:00"));
    let devices: Vec<u8> = events.iter().map(|e| e.device).collect();
    assert_eq!(devices, vec![3, 4]);
    assert!(events
        .iter()
        .all(|e| matches!(e.outcome, Err(HubError::TransmissionFailed(_)))));

    // Lookups and snapshots are unaffected
    assert_eq!(hub.snapshot().devices.len(), 2);
    assert!(hub.report().contains("device 4 pin 3 type=toggle_switch state=0"));
}

// ============================================================================
// Configuration requests
// ============================================================================

fn request(pairs: &[(&str, &str)]) -> ConfigRequest {
    ConfigRequest::from_pairs(pairs.iter().copied()).unwrap()
}

#[test]
fn form_sets_schedule_and_state() {
    let mut hub = hub(MockTransport::new());
    let req = request(&[
        ("deviceId", "4"),
        ("3:onAt", "18:40"),
        ("3:offAt", "18:41"),
        ("2:state", "1"),
    ]);

    let report = hub.apply(&req).unwrap().unwrap();
    assert!(report.is_success());
    assert_eq!(report.schedules_updated, vec![3]);
    assert_eq!(report.switched, vec![(2, PinState::On)]);

    let pin = hub.lookup(4).unwrap().pin(3).unwrap();
    assert_eq!(pin.on_at(), Some(t("18:40")));
    assert_eq!(pin.off_at(), Some(t("18:41")));

    hub.refresh_schedules(t("18:40"));
    assert_eq!(state_of(&hub, 4, 3), PinState::On);
    hub.refresh_schedules(t("18:41"));
    assert_eq!(state_of(&hub, 4, 3), PinState::Off);
}

#[test]
fn unset_marker_clears_schedule() {
    let mut hub = hub(MockTransport::new());
    hub.apply(&request(&[("deviceId", "3"), ("3:onAt", "06:00"), ("3:offAt", "07:00")]))
        .unwrap();
    hub.apply(&request(&[("deviceId", "3"), ("3:onAt", "---"), ("3:offAt", "---")]))
        .unwrap();

    assert_eq!(hub.lookup(3).unwrap().pin(3).unwrap().schedule(), None);
    assert_eq!(hub.snapshot().devices[0].pins[1].on_at, "---");
}

#[test]
fn half_schedule_rejects_whole_request() {
    let mut hub = hub(MockTransport::new());
    let req = request(&[("deviceId", "4"), ("2:state", "1"), ("3:onAt", "10:00")]);

    assert_eq!(hub.apply(&req), Err(HubError::InvalidSchedule { device: 4, pin: 3 }));
    // Nothing was applied, not even the valid state change
    assert_eq!(state_of(&hub, 4, 2), PinState::Off);
    assert_eq!(hub.link().with_transport(|r| r.write_count()), 0);
}

#[test]
fn one_time_completes_existing_schedule() {
    let mut hub = hub(MockTransport::new());
    hub.apply(&request(&[("deviceId", "4"), ("3:onAt", "10:00"), ("3:offAt", "11:00")]))
        .unwrap();
    hub.apply(&request(&[("deviceId", "4"), ("3:offAt", "12:00")]))
        .unwrap();

    assert_eq!(
        hub.lookup(4).unwrap().pin(3).unwrap().schedule(),
        Some(Schedule::new(t("10:00"), t("12:00")))
    );
}

#[test]
fn failed_pin_does_not_stop_the_batch() {
    let mut radio = MockTransport::new();
    // Pin 2 pulse: first packet lost five times
    radio.drop_next(5);
    let mut hub = hub(radio);
    let req = request(&[("deviceId", "3"), ("3:state", "1"), ("2:state", "1")]);

    let report = hub.apply(&req).unwrap().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 2);
    assert_eq!(report.switched, vec![(3, PinState::On)]);
    assert_eq!(state_of(&hub, 3, 2), PinState::Off);
    assert_eq!(state_of(&hub, 3, 3), PinState::On);
}

#[test]
fn discard_ignores_everything_else() {
    let mut hub = hub(MockTransport::new());
    let req = request(&[("deviceId", "-1"), ("2:state", "1"), ("bogus", "x")]);

    assert!(req.is_discard());
    assert_eq!(hub.apply(&req), Ok(None));
    assert_eq!(hub.link().with_transport(|r| r.write_count()), 0);
}

#[test]
fn malformed_requests_are_rejected() {
    assert_eq!(
        ConfigRequest::from_pairs([("2:state", "1")]),
        Err(RequestError::MissingDeviceId)
    );
    assert!(matches!(
        ConfigRequest::from_pairs([("deviceId", "abc")]),
        Err(RequestError::InvalidDeviceId(_))
    ));
    assert!(matches!(
        ConfigRequest::from_pairs([("deviceId", "3"), ("3:onAt", "25:00")]),
        Err(RequestError::InvalidTime { pin: 3, .. })
    ));
    assert!(matches!(
        ConfigRequest::from_pairs([("deviceId", "3"), ("3:colour", "red")]),
        Err(RequestError::UnknownField(_))
    ));
}

#[test]
fn state_change_on_input_pin_fails_request() {
    let mut hub = hub(MockTransport::new());
    let req = request(&[("deviceId", "5"), ("7:state", "1")]);

    assert!(matches!(
        hub.apply(&req),
        Err(HubError::UnsupportedOperation { device: 5, pin: 7, .. })
    ));
}
