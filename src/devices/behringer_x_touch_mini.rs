// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

//! Behringer X-Touch Mini.
//!
//! 8 push-encoders, 16 pads in two rows, 1 fader. Two layers (A/B)
//! switched by a hardware button; the device never announces the
//! switch, so the active layer is inferred from the note/CC range of
//! incoming traffic. All controls live on MIDI channel 11.
//!
//! Wire mapping (factory defaults):
//!
//! | Control          | Layer A    | Layer B    |
//! |------------------|------------|------------|
//! | Knob buttons 1-8 | Notes 0-7  | Notes 24-31|
//! | Pads 1-16        | Notes 8-23 | Notes 32-47|
//! | Knobs 1-8        | CC 1-8     | CC 11-18   |
//! | Fader            | CC 9       | CC 10      |
//!
//! Pad LEDs do not track presses by themselves; the library re-emits
//! note feedback (velocity `0x7f`/`0x00`) whenever a pad's logical
//! state changes.

use std::sync::Arc;

use crate::{
    registry::RegistryEntry, BankId, BankSwitchMode, CapabilitySet, ControlDefinition, ControlId,
    ControlType, ControllerPlugin, DeviceDescriptor, FeedbackState, Layout, MidiDeviceDescriptor,
    RawInputEvent, WireMessage,
};

pub const MIDI_DEVICE_DESCRIPTOR: &MidiDeviceDescriptor = &MidiDeviceDescriptor {
    device: DeviceDescriptor {
        vendor_name: std::borrow::Cow::Borrowed("Behringer"),
        model_name: std::borrow::Cow::Borrowed("X-Touch Mini"),
    },
    port_name_prefix: "X-TOUCH MINI",
};

const MIDI_CHANNEL: u8 = 10; // Channel 11, 0-indexed

const LAYER_A: &str = "layer_a";
const LAYER_B: &str = "layer_b";

const KNOB_BUTTON_COUNT: u8 = 8;
const PAD_COUNT: u8 = 16;
const KNOB_COUNT: u8 = 8;

// First note/CC of each range, per layer.
const KNOB_BUTTON_BASE: [u8; 2] = [0, 24];
const PAD_BASE: [u8; 2] = [8, 32];
const KNOB_CC_BASE: [u8; 2] = [1, 11];
const FADER_CC: [u8; 2] = [9, 10];

const fn layer_name(layer: usize) -> &'static str {
    if layer == 0 {
        LAYER_A
    } else {
        LAYER_B
    }
}

#[must_use]
pub fn registry_entry() -> RegistryEntry {
    RegistryEntry {
        descriptor: MIDI_DEVICE_DESCRIPTOR,
        new_plugin: || Arc::new(XTouchMini::new()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XTouchMini;

impl XTouchMini {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn decode_note(ts: crate::TimeStamp, note: u8, velocity: u8) -> Option<RawInputEvent> {
        for layer in 0..2 {
            let knob_button_base = KNOB_BUTTON_BASE[layer];
            if (knob_button_base..knob_button_base + KNOB_BUTTON_COUNT).contains(&note) {
                return Some(RawInputEvent::Control {
                    ts,
                    control_id: format!("knob_button_{n}", n = note - knob_button_base + 1).into(),
                    value: u16::from(velocity),
                    bank_id: Some(layer_name(layer).into()),
                });
            }
            let pad_base = PAD_BASE[layer];
            if (pad_base..pad_base + PAD_COUNT).contains(&note) {
                return Some(RawInputEvent::Control {
                    ts,
                    control_id: format!("pad_{n}", n = note - pad_base + 1).into(),
                    value: u16::from(velocity),
                    bank_id: Some(layer_name(layer).into()),
                });
            }
        }
        None
    }

    fn decode_cc(ts: crate::TimeStamp, cc: u8, value: u8) -> Option<RawInputEvent> {
        for layer in 0..2 {
            let knob_base = KNOB_CC_BASE[layer];
            if (knob_base..knob_base + KNOB_COUNT).contains(&cc) {
                return Some(RawInputEvent::Control {
                    ts,
                    control_id: format!("knob_{n}", n = cc - knob_base + 1).into(),
                    value: u16::from(value),
                    bank_id: Some(layer_name(layer).into()),
                });
            }
            if cc == FADER_CC[layer] {
                return Some(RawInputEvent::Control {
                    ts,
                    control_id: "fader_1".into(),
                    value: u16::from(value),
                    bank_id: Some(layer_name(layer).into()),
                });
            }
        }
        None
    }

    fn pad_note(layer: usize, control_id: &ControlId) -> Option<u8> {
        let pad: u8 = control_id.as_str().strip_prefix("pad_")?.parse().ok()?;
        if !(1..=PAD_COUNT).contains(&pad) {
            return None;
        }
        Some(PAD_BASE[layer] + pad - 1)
    }
}

impl ControllerPlugin for XTouchMini {
    fn descriptor(&self) -> &MidiDeviceDescriptor {
        MIDI_DEVICE_DESCRIPTOR
    }

    fn layout(&self) -> Layout {
        let banks = (0..2)
            .map(|layer| {
                let mut controls = Vec::with_capacity(33);
                for n in 1..=KNOB_BUTTON_COUNT {
                    controls.push(ControlDefinition {
                        category: Some("encoder".into()),
                        ..ControlDefinition::new(
                            format!("knob_button_{n}"),
                            ControlType::Momentary,
                        )
                    });
                }
                for n in 1..=PAD_COUNT {
                    controls.push(ControlDefinition {
                        capabilities: CapabilitySet {
                            supports_feedback: true,
                            requires_feedback: true,
                            supports_led: true,
                            ..Default::default()
                        },
                        category: Some("pad".into()),
                        ..ControlDefinition::new(format!("pad_{n}"), ControlType::Toggle)
                    });
                }
                for n in 1..=KNOB_COUNT {
                    controls.push(ControlDefinition {
                        category: Some("encoder".into()),
                        ..ControlDefinition::new(format!("knob_{n}"), ControlType::Continuous)
                    });
                }
                controls.push(ControlDefinition {
                    category: Some("fader".into()),
                    ..ControlDefinition::new("fader_1", ControlType::Continuous)
                });
                (BankId::from(layer_name(layer)), controls)
            })
            .collect();
        Layout {
            switch_mode: BankSwitchMode::Hardware,
            initial_bank: LAYER_A.into(),
            banks,
        }
    }

    fn decode(&self, message: &WireMessage) -> Option<RawInputEvent> {
        let [status, data1, data2] = *message.bytes.as_slice() else {
            return None;
        };
        if status & 0x0f != MIDI_CHANNEL {
            return None;
        }
        match status & 0xf0 {
            0x90 => Self::decode_note(message.ts, data1, data2),
            0x80 => Self::decode_note(message.ts, data1, 0),
            0xb0 => Self::decode_cc(message.ts, data1, data2),
            _ => None,
        }
    }

    fn encode(
        &self,
        bank_id: &BankId,
        control_id: &ControlId,
        state: &FeedbackState,
    ) -> Option<WireMessage> {
        let layer = match bank_id.as_str() {
            LAYER_A => 0,
            LAYER_B => 1,
            _ => return None,
        };
        let note = Self::pad_note(layer, control_id)?;
        let velocity = if state.is_on { 0x7f } else { 0x00 };
        Some(WireMessage::note_on(MIDI_CHANNEL, note, velocity))
    }

    fn init_messages(&self) -> Vec<WireMessage> {
        // Blank every pad LED in both layers.
        (0..2)
            .flat_map(|layer| {
                (0..PAD_COUNT).map(move |pad| {
                    WireMessage::note_on(MIDI_CHANNEL, PAD_BASE[layer] + pad, 0x00)
                })
            })
            .collect()
    }

    fn shutdown_messages(&self) -> Vec<WireMessage> {
        self.init_messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeStamp;

    fn decode(bytes: &[u8]) -> Option<RawInputEvent> {
        XTouchMini::new().decode(&WireMessage::received(TimeStamp::ZERO, bytes))
    }

    #[test]
    fn pad_press_carries_the_layer_it_belongs_to() {
        let event = decode(&[0x9a, 8, 127]).expect("layer A pad");
        assert_eq!(
            RawInputEvent::Control {
                ts: TimeStamp::ZERO,
                control_id: "pad_1".into(),
                value: 127,
                bank_id: Some(LAYER_A.into()),
            },
            event,
        );

        let event = decode(&[0x9a, 32, 127]).expect("layer B pad");
        assert_eq!(
            RawInputEvent::Control {
                ts: TimeStamp::ZERO,
                control_id: "pad_1".into(),
                value: 127,
                bank_id: Some(LAYER_B.into()),
            },
            event,
        );
    }

    #[test]
    fn knob_and_fader_ranges_decode_per_layer() {
        let RawInputEvent::Control {
            control_id,
            bank_id,
            ..
        } = decode(&[0xba, 11, 64]).expect("layer B knob")
        else {
            panic!("control event expected");
        };
        assert_eq!(ControlId::from("knob_1"), control_id);
        assert_eq!(Some(BankId::from(LAYER_B)), bank_id);

        let RawInputEvent::Control {
            control_id,
            bank_id,
            ..
        } = decode(&[0xba, 9, 64]).expect("layer A fader")
        else {
            panic!("control event expected");
        };
        assert_eq!(ControlId::from("fader_1"), control_id);
        assert_eq!(Some(BankId::from(LAYER_A)), bank_id);
    }

    #[test]
    fn traffic_on_other_channels_is_ignored() {
        assert!(decode(&[0x90, 8, 127]).is_none());
        assert!(decode(&[0xb0, 1, 64]).is_none());
    }

    #[test]
    fn pad_feedback_targets_the_layer_note() {
        let plugin = XTouchMini::new();
        let state = FeedbackState {
            is_on: true,
            value: 127,
            color: None,
        };
        assert_eq!(
            Some(WireMessage::note_on(MIDI_CHANNEL, 8, 0x7f)),
            plugin.encode(&LAYER_A.into(), &"pad_1".into(), &state),
        );
        assert_eq!(
            Some(WireMessage::note_on(MIDI_CHANNEL, 47, 0x7f)),
            plugin.encode(&LAYER_B.into(), &"pad_16".into(), &state),
        );
        assert_eq!(None, plugin.encode(&LAYER_A.into(), &"knob_1".into(), &state));
    }

    #[test]
    fn layout_declares_both_layers() {
        let layout = XTouchMini::new().layout();
        assert_eq!(2, layout.banks.len());
        for (_, controls) in &layout.banks {
            assert_eq!(33, controls.len());
        }
    }
}
