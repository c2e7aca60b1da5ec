// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

//! Fallback plugin mapping plain note/CC traffic 1:1 to controls.
//!
//! Useful for unknown hardware and for tests: every note number becomes
//! a momentary control, every CC number a continuous one. No feedback,
//! no banks, no capabilities beyond input.

use crate::{
    BankId, BankSwitchMode, ControlDefinition, ControlId, ControlType, ControllerPlugin,
    DeviceDescriptor, FeedbackState, Layout, MidiDeviceDescriptor, RawInputEvent, WireMessage,
};

pub const MIDI_DEVICE_DESCRIPTOR: &MidiDeviceDescriptor = &MidiDeviceDescriptor {
    device: DeviceDescriptor {
        vendor_name: std::borrow::Cow::Borrowed("Generic"),
        model_name: std::borrow::Cow::Borrowed("MIDI Controller"),
    },
    // Matches any port; never auto-detected.
    port_name_prefix: "",
};

const BANK: &str = "main";

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericMidi;

impl GenericMidi {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ControllerPlugin for GenericMidi {
    fn descriptor(&self) -> &MidiDeviceDescriptor {
        MIDI_DEVICE_DESCRIPTOR
    }

    fn layout(&self) -> Layout {
        let mut controls = Vec::with_capacity(256);
        for note in 0u8..=127 {
            controls.push(ControlDefinition {
                category: Some("note".into()),
                ..ControlDefinition::new(format!("note_{note}"), ControlType::Momentary)
            });
        }
        for cc in 0u8..=127 {
            controls.push(ControlDefinition {
                category: Some("cc".into()),
                ..ControlDefinition::new(format!("cc_{cc}"), ControlType::Continuous)
            });
        }
        Layout {
            switch_mode: BankSwitchMode::Hardware,
            initial_bank: BANK.into(),
            banks: vec![(BANK.into(), controls)],
        }
    }

    fn decode(&self, message: &WireMessage) -> Option<RawInputEvent> {
        let [status, data1, data2] = *message.bytes.as_slice() else {
            return None;
        };
        let (control_id, value): (ControlId, u16) = match status & 0xf0 {
            0x90 => (format!("note_{data1}").into(), u16::from(data2)),
            0x80 => (format!("note_{data1}").into(), 0),
            0xb0 => (format!("cc_{data1}").into(), u16::from(data2)),
            _ => return None,
        };
        Some(RawInputEvent::Control {
            ts: message.ts,
            control_id,
            value,
            bank_id: None,
        })
    }

    fn encode(
        &self,
        _bank_id: &BankId,
        _control_id: &ControlId,
        _state: &FeedbackState,
    ) -> Option<WireMessage> {
        None
    }
}
