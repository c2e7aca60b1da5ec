// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::Mutex as StdMutex;

use super::*;
use crate::{
    BankSwitchMode, CapabilitySet, Color, ControlDefinition, DeviceDescriptor, LoopbackTransport,
    MidiDeviceDescriptor, TimeStamp,
};

struct TestPlugin {
    descriptor: MidiDeviceDescriptor,
    switch_mode: BankSwitchMode,
}

impl TestPlugin {
    fn new(switch_mode: BankSwitchMode) -> Arc<Self> {
        Arc::new(Self {
            descriptor: MidiDeviceDescriptor {
                device: DeviceDescriptor {
                    vendor_name: "Acme".into(),
                    model_name: "Test Pad".into(),
                },
                port_name_prefix: "Acme Test Pad",
            },
            switch_mode,
        })
    }
}

impl ControllerPlugin for TestPlugin {
    fn descriptor(&self) -> &MidiDeviceDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> Layout {
        let bank_a = vec![
            ControlDefinition {
                capabilities: CapabilitySet {
                    supports_feedback: true,
                    requires_feedback: true,
                    supports_led: true,
                    ..Default::default()
                },
                category: Some("pad".into()),
                on_color: Some(Color::GREEN),
                off_color: Some(Color::OFF),
                ..ControlDefinition::new("pad_1", ControlType::Toggle)
            },
            ControlDefinition {
                category: Some("fader".into()),
                ..ControlDefinition::new("fader_1", ControlType::Continuous)
            },
            ControlDefinition::new("knob_1", ControlType::Continuous),
            ControlDefinition::new("button_1", ControlType::Momentary),
        ];
        // Same id, different physical control: color-capable in bank B.
        let bank_b = vec![ControlDefinition {
            capabilities: CapabilitySet {
                supports_feedback: true,
                supports_color: true,
                ..Default::default()
            },
            ..ControlDefinition::new("pad_1", ControlType::Toggle)
        }];
        Layout {
            switch_mode: self.switch_mode,
            initial_bank: "bank_a".into(),
            banks: vec![("bank_a".into(), bank_a), ("bank_b".into(), bank_b)],
        }
    }

    fn decode(&self, _message: &WireMessage) -> Option<RawInputEvent> {
        None
    }

    fn encode(
        &self,
        _bank_id: &BankId,
        control_id: &ControlId,
        state: &FeedbackState,
    ) -> Option<WireMessage> {
        (control_id.as_str() == "pad_1")
            .then(|| WireMessage::note_on(0, 0x05, if state.is_on { 0x7f } else { 0x00 }))
    }

    fn switch_bank_command(&self, bank_id: &BankId) -> Option<WireMessage> {
        let program = u8::from(bank_id.as_str() == "bank_b");
        Some(WireMessage::program_change(0, program))
    }
}

fn engine(switch_mode: BankSwitchMode) -> (Arc<ControlStateEngine>, Arc<DispatchHub>) {
    let plugin = TestPlugin::new(switch_mode);
    let hub = Arc::new(DispatchHub::new());
    let layout = plugin.layout();
    let engine = Arc::new(ControlStateEngine::new(
        plugin,
        Arc::clone(&hub),
        layout,
        None,
        FeedbackPolicy::Immediate,
    ));
    (engine, hub)
}

fn engine_with_transport(
    feedback_policy: FeedbackPolicy,
) -> (Arc<ControlStateEngine>, Arc<StdMutex<LoopbackTransport>>) {
    let plugin = TestPlugin::new(BankSwitchMode::Hardware);
    let hub = Arc::new(DispatchHub::new());
    let layout = plugin.layout();
    let transport = Arc::new(StdMutex::new(LoopbackTransport::new()));
    let sink: Arc<StdMutex<dyn crate::MidiTransport>> = transport.clone();
    let engine = Arc::new(ControlStateEngine::new(
        plugin,
        hub,
        layout,
        Some(sink),
        feedback_policy,
    ));
    (engine, transport)
}

fn input(control_id: &'static str, value: u16) -> RawInputEvent {
    RawInputEvent::Control {
        ts: TimeStamp::ZERO,
        control_id: control_id.into(),
        value,
        bank_id: None,
    }
}

#[test]
fn continuous_discovery_is_independent_per_control() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    assert!(!engine.state(&"fader_1".into()).unwrap().is_discovered());
    assert!(!engine.state(&"knob_1".into()).unwrap().is_discovered());

    engine.apply_input(input("fader_1", 64)).unwrap();
    assert!(engine.state(&"fader_1".into()).unwrap().is_discovered());
    assert!(!engine.state(&"knob_1".into()).unwrap().is_discovered());

    let mut undiscovered = engine.undiscovered_controls();
    undiscovered.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(
        vec![ControlId::from("knob_1")],
        undiscovered
            .into_iter()
            .filter(|id| id.as_str().starts_with("knob"))
            .collect::<Vec<_>>(),
    );
}

#[test]
fn duplicate_input_dispatches_at_most_once() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let notifications = Arc::new(StdMutex::new(0));
    {
        let notifications = Arc::clone(&notifications);
        hub.register_by_control("knob_1", move |_| {
            *notifications.lock().unwrap() += 1;
        });
    }
    assert!(engine.apply_input(input("knob_1", 42)).unwrap().is_some());
    assert!(engine.apply_input(input("knob_1", 42)).unwrap().is_none());
    assert_eq!(1, *notifications.lock().unwrap());
}

#[test]
fn per_control_dispatch_order_matches_event_order() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let observed = Arc::new(StdMutex::new(Vec::new()));
    {
        let observed = Arc::clone(&observed);
        hub.register_by_control("knob_1", move |notification| {
            let (value, _) = notification.delta.value.expect("value change");
            observed.lock().unwrap().push(value);
        });
    }
    for value in 1..=8 {
        engine.apply_input(input("knob_1", value)).unwrap();
    }
    assert_eq!((1..=8).collect::<Vec<u16>>(), *observed.lock().unwrap());
}

#[test]
fn observer_fault_does_not_stall_ingestion() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    hub.register_by_control("knob_1", |_| panic!("observer fault"));
    let survived = Arc::new(StdMutex::new(0));
    {
        let survived = Arc::clone(&survived);
        hub.register_by_control("knob_1", move |_| *survived.lock().unwrap() += 1);
    }
    engine.apply_input(input("knob_1", 1)).unwrap();
    engine.apply_input(input("knob_1", 2)).unwrap();
    assert_eq!(2, *survived.lock().unwrap());
}

#[test]
fn notification_state_agrees_with_engine_state() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let checked = Arc::new(StdMutex::new(false));
    {
        let engine = Arc::clone(&engine);
        let checked = Arc::clone(&checked);
        hub.register_by_control("pad_1", move |notification| {
            // The mutation is committed and visible before dispatch;
            // reading back through the engine must not deadlock.
            let state = engine.state(&notification.control_id).unwrap();
            assert_eq!(state, notification.state);
            *checked.lock().unwrap() = true;
        });
    }
    engine.apply_input(input("pad_1", 127)).unwrap();
    assert!(*checked.lock().unwrap());
}

#[test]
fn unknown_control_is_a_hard_error() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    let err = engine.apply_input(input("pad_99", 1)).unwrap_err();
    assert!(matches!(err, EngineError::UnknownControl(_)));

    let err = engine
        .apply_command(
            &"pad_99".into(),
            &StateUpdate {
                is_on: Some(true),
                ..Default::default()
            },
            ValidationMode::Permissive,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownControl(_)));
    assert!(!engine.can_set_state(&"pad_99".into(), &StateUpdate::default()));
}

#[test]
fn value_on_momentary_is_a_type_mismatch_in_both_modes() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    let update = StateUpdate {
        value: Some(64),
        ..Default::default()
    };
    for mode in [ValidationMode::Strict, ValidationMode::Permissive] {
        let err = engine
            .apply_command(&"button_1".into(), &update, mode)
            .unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }
    assert!(!engine.can_set_state(&"button_1".into(), &update));
}

#[test]
fn strict_rejects_unsupported_value_permissive_drops_it() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let notifications = Arc::new(StdMutex::new(0));
    {
        let notifications = Arc::clone(&notifications);
        hub.register_by_control("fader_1", move |_| {
            *notifications.lock().unwrap() += 1;
        });
    }
    let update = StateUpdate {
        value: Some(64),
        ..Default::default()
    };
    let err = engine
        .apply_command(&"fader_1".into(), &update, ValidationMode::Strict)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Capability(validate::CapabilityError::UnsupportedValueSet)
    ));

    // Permissive: the unsupported field is dropped, nothing remains,
    // the call still succeeds and nothing is dispatched.
    let delta = engine
        .apply_command(&"fader_1".into(), &update, ValidationMode::Permissive)
        .unwrap();
    assert!(delta.is_empty());
    assert_eq!(0, *notifications.lock().unwrap());
    assert_eq!(None, engine.state(&"fader_1".into()).unwrap().value());
}

#[test]
fn same_id_resolves_to_distinct_controls_across_banks() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    let update = StateUpdate {
        color: Some(Color::RED),
        ..Default::default()
    };
    // Bank A's pad has no color support.
    assert!(!engine.can_set_state(&"pad_1".into(), &update));

    engine
        .apply_input(RawInputEvent::BankReported {
            ts: TimeStamp::ZERO,
            bank_id: "bank_b".into(),
        })
        .unwrap();
    assert_eq!(BankId::from("bank_b"), engine.active_bank());
    // Bank B's pad does.
    assert!(engine.can_set_state(&"pad_1".into(), &update));

    // And ids from bank A are not silently honored.
    assert!(engine.state(&"fader_1".into()).is_none());
}

#[test]
fn bank_hint_in_control_traffic_switches_and_notifies() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let switches = Arc::new(StdMutex::new(Vec::new()));
    {
        let switches = Arc::clone(&switches);
        hub.register_bank(move |bank_id| switches.lock().unwrap().push(bank_id.clone()));
    }
    engine
        .apply_input(RawInputEvent::Control {
            ts: TimeStamp::ZERO,
            control_id: "pad_1".into(),
            value: 127,
            bank_id: Some("bank_b".into()),
        })
        .unwrap();
    assert_eq!(vec![BankId::from("bank_b")], *switches.lock().unwrap());
    assert!(engine.state(&"pad_1".into()).unwrap().is_on());
}

#[test]
fn software_switch_emits_the_plugin_command() {
    let plugin = TestPlugin::new(BankSwitchMode::Software);
    let hub = Arc::new(DispatchHub::new());
    let layout = plugin.layout();
    let transport = Arc::new(StdMutex::new(LoopbackTransport::new()));
    let sink: Arc<StdMutex<dyn crate::MidiTransport>> = transport.clone();
    let engine = ControlStateEngine::new(
        plugin,
        Arc::clone(&hub),
        layout,
        Some(sink),
        FeedbackPolicy::Immediate,
    );
    let switches = Arc::new(StdMutex::new(Vec::new()));
    {
        let switches = Arc::clone(&switches);
        hub.register_bank(move |bank_id| switches.lock().unwrap().push(bank_id.clone()));
    }

    engine.switch_bank(&"bank_b".into()).unwrap();
    assert_eq!(BankId::from("bank_b"), engine.active_bank());
    assert_eq!(vec![BankId::from("bank_b")], *switches.lock().unwrap());
    assert_eq!(
        vec![WireMessage::program_change(0, 1)],
        transport.lock().unwrap().sent,
    );

    let err = engine.switch_bank(&"bank_c".into()).unwrap_err();
    assert!(matches!(err, EngineError::Bank(BankError::UnknownBank(_))));
}

#[test]
fn hardware_switch_requests_are_rejected() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    let err = engine.switch_bank(&"bank_b".into()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Bank(BankError::UnsupportedOperation)
    ));
}

#[test]
fn required_feedback_is_sent_immediately() {
    let (engine, transport) = engine_with_transport(FeedbackPolicy::Immediate);
    engine.apply_input(input("pad_1", 127)).unwrap();
    assert_eq!(
        vec![WireMessage::note_on(0, 0x05, 0x7f)],
        transport.lock().unwrap().sent,
    );
}

#[test]
fn deferred_feedback_is_queued_until_drained() {
    let (engine, transport) = engine_with_transport(FeedbackPolicy::Deferred);
    engine.apply_input(input("pad_1", 127)).unwrap();
    assert!(transport.lock().unwrap().sent.is_empty());

    let pending = engine.take_pending_output();
    assert_eq!(vec![WireMessage::note_on(0, 0x05, 0x7f)], pending);
    assert!(engine.take_pending_output().is_empty());
}

#[test]
fn momentary_trigger_is_transient() {
    let (engine, hub) = engine(BankSwitchMode::Hardware);
    let triggers = Arc::new(StdMutex::new(Vec::new()));
    {
        let triggers = Arc::clone(&triggers);
        hub.register_by_control("button_1", move |notification| {
            triggers.lock().unwrap().push(notification.delta.triggered);
        });
    }
    engine.apply_input(input("button_1", 127)).unwrap();
    engine.apply_input(input("button_1", 0)).unwrap();
    assert_eq!(vec![true, false], *triggers.lock().unwrap());
    assert!(!engine.state(&"button_1".into()).unwrap().is_on());
}

#[test]
fn change_log_keeps_recent_changes_in_order() {
    let (engine, _) = engine(BankSwitchMode::Hardware);
    for value in 1..=3 {
        engine.apply_input(input("knob_1", value)).unwrap();
    }
    let log = engine.change_log(2);
    assert_eq!(2, log.len());
    assert_eq!(Some((3, 3.0 / 127.0)), log[1].1.value);
}
