// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

//! AKAI LPD8 MK2.
//!
//! 8 RGB pads and 8 knobs, replicated across four programs (banks)
//! that the library may switch via Program Change. Each program sends
//! on its own MIDI channel (program 1 = channel 1, ...), which lets
//! the active program be inferred from ordinary traffic.
//!
//! Pad LEDs are managed by the device itself: pressing a pad lights it
//! with the programmed color without any help from the host. Colors
//! are pushed with the `0x06` LED update SysEx:
//!
//! ```text
//! F0 47 7F 4C 06 00 30 <8 x R G B, two 7-bit bytes each> F7
//! ```
//!
//! The update always carries all eight pads, so the plugin keeps the
//! last written color per pad to avoid blanking its neighbors.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    registry::RegistryEntry, BankId, BankSwitchMode, CapabilitySet, Color, ControlDefinition,
    ControlId, ControlType, ControllerPlugin, DeviceDescriptor, FeedbackState, Layout,
    MidiDeviceDescriptor, RawInputEvent, WireMessage,
};

pub const MIDI_DEVICE_DESCRIPTOR: &MidiDeviceDescriptor = &MidiDeviceDescriptor {
    device: DeviceDescriptor {
        vendor_name: std::borrow::Cow::Borrowed("AKAI"),
        model_name: std::borrow::Cow::Borrowed("LPD8 MK2"),
    },
    port_name_prefix: "LPD8 mk2",
};

const PAD_COUNT: u8 = 8;
const KNOB_COUNT: u8 = 8;
const PROGRAM_COUNT: u8 = 4;

// Factory defaults.
const PAD_BASE_NOTE: u8 = 36;
const KNOB_BASE_CC: u8 = 1;

// SysEx framing.
const SYSEX_MANUFACTURER: u8 = 0x47;
const SYSEX_DEVICE_ID: u8 = 0x7f;
const SYSEX_PRODUCT_ID: u8 = 0x4c;
const SYSEX_LED_CMD: u8 = 0x06;
const SYSEX_LED_SUBID: [u8; 2] = [0x00, 0x30];

fn program_bank(program: u8) -> BankId {
    format!("program_{n}", n = program + 1).into()
}

fn bank_program(bank_id: &BankId) -> Option<u8> {
    let program: u8 = bank_id.as_str().strip_prefix("program_")?.parse().ok()?;
    if !(1..=PROGRAM_COUNT).contains(&program) {
        return None;
    }
    Some(program - 1)
}

#[must_use]
pub fn registry_entry() -> RegistryEntry {
    RegistryEntry {
        descriptor: MIDI_DEVICE_DESCRIPTOR,
        new_plugin: || Arc::new(Lpd8Mk2::new()),
    }
}

/// The LED update SysEx always rewrites all eight pads, so the last
/// written color of each pad is tracked here.
#[derive(Debug, Default)]
pub struct Lpd8Mk2 {
    led_colors: Mutex<[Color; PAD_COUNT as usize]>,
}

impl Lpd8Mk2 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            led_colors: Mutex::new([Color::OFF; PAD_COUNT as usize]),
        }
    }

    fn led_update(&self, pad_index: usize, color: Color) -> WireMessage {
        let colors = {
            let mut colors = self
                .led_colors
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            colors[pad_index] = color;
            *colors
        };
        let mut payload = Vec::with_capacity(7 + 6 * PAD_COUNT as usize);
        payload.extend_from_slice(&[
            SYSEX_MANUFACTURER,
            SYSEX_DEVICE_ID,
            SYSEX_PRODUCT_ID,
            SYSEX_LED_CMD,
            SYSEX_LED_SUBID[0],
            SYSEX_LED_SUBID[1],
        ]);
        for color in colors {
            for component in [color.red, color.green, color.blue] {
                // Each 8-bit component is split into two 7-bit bytes.
                payload.push(component >> 7);
                payload.push(component & 0x7f);
            }
        }
        WireMessage::sysex(&payload)
    }

    fn led_update_all(&self, color: Color) -> WireMessage {
        {
            let mut colors = self
                .led_colors
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *colors = [color; PAD_COUNT as usize];
        }
        self.led_update(0, color)
    }
}

impl ControllerPlugin for Lpd8Mk2 {
    fn descriptor(&self) -> &MidiDeviceDescriptor {
        MIDI_DEVICE_DESCRIPTOR
    }

    fn layout(&self) -> Layout {
        let banks = (0..PROGRAM_COUNT)
            .map(|program| {
                let mut controls = Vec::with_capacity((PAD_COUNT + KNOB_COUNT) as usize);
                for n in 1..=PAD_COUNT {
                    controls.push(ControlDefinition {
                        capabilities: CapabilitySet {
                            supports_feedback: true,
                            supports_led: true,
                            supports_color: true,
                            // The device lights pads on its own.
                            requires_feedback: false,
                            ..Default::default()
                        },
                        category: Some("pad".into()),
                        ..ControlDefinition::new(format!("pad_{n}"), ControlType::Toggle)
                    });
                }
                for n in 1..=KNOB_COUNT {
                    controls.push(ControlDefinition {
                        category: Some("knob".into()),
                        ..ControlDefinition::new(format!("knob_{n}"), ControlType::Continuous)
                    });
                }
                (program_bank(program), controls)
            })
            .collect();
        Layout {
            switch_mode: BankSwitchMode::Software,
            initial_bank: program_bank(0),
            banks,
        }
    }

    fn decode(&self, message: &WireMessage) -> Option<RawInputEvent> {
        match *message.bytes.as_slice() {
            [status, data1, data2] => {
                let channel = status & 0x0f;
                if channel >= PROGRAM_COUNT {
                    return None;
                }
                let bank_id = Some(program_bank(channel));
                match status & 0xf0 {
                    0x90 | 0x80 if (PAD_BASE_NOTE..PAD_BASE_NOTE + PAD_COUNT).contains(&data1) => {
                        let velocity = if status & 0xf0 == 0x80 { 0 } else { data2 };
                        Some(RawInputEvent::Control {
                            ts: message.ts,
                            control_id: format!("pad_{n}", n = data1 - PAD_BASE_NOTE + 1).into(),
                            value: u16::from(velocity),
                            bank_id,
                        })
                    }
                    0xb0 if (KNOB_BASE_CC..KNOB_BASE_CC + KNOB_COUNT).contains(&data1) => {
                        Some(RawInputEvent::Control {
                            ts: message.ts,
                            control_id: format!("knob_{n}", n = data1 - KNOB_BASE_CC + 1).into(),
                            value: u16::from(data2),
                            bank_id,
                        })
                    }
                    _ => None,
                }
            }
            // The device announces program switches made on the hardware.
            [status, program] if status & 0xf0 == 0xc0 && program < PROGRAM_COUNT => {
                Some(RawInputEvent::BankReported {
                    ts: message.ts,
                    bank_id: program_bank(program),
                })
            }
            _ => None,
        }
    }

    fn encode(
        &self,
        _bank_id: &BankId,
        control_id: &ControlId,
        state: &FeedbackState,
    ) -> Option<WireMessage> {
        let pad: u8 = control_id.as_str().strip_prefix("pad_")?.parse().ok()?;
        if !(1..=PAD_COUNT).contains(&pad) {
            return None;
        }
        let color = if state.is_on {
            state.color.unwrap_or(Color::WHITE)
        } else {
            state.color.unwrap_or(Color::OFF)
        };
        Some(self.led_update(usize::from(pad - 1), color))
    }

    fn switch_bank_command(&self, bank_id: &BankId) -> Option<WireMessage> {
        bank_program(bank_id).map(|program| WireMessage::program_change(program, program))
    }

    fn shutdown_messages(&self) -> Vec<WireMessage> {
        vec![self.led_update_all(Color::OFF)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeStamp;

    fn decode(plugin: &Lpd8Mk2, bytes: &[u8]) -> Option<RawInputEvent> {
        plugin.decode(&WireMessage::received(TimeStamp::ZERO, bytes))
    }

    #[test]
    fn channel_identifies_the_program() {
        let plugin = Lpd8Mk2::new();
        let RawInputEvent::Control {
            control_id,
            bank_id,
            ..
        } = decode(&plugin, &[0x92, 38, 100]).expect("pad on program 3")
        else {
            panic!("control event expected");
        };
        assert_eq!(ControlId::from("pad_3"), control_id);
        assert_eq!(Some(BankId::from("program_3")), bank_id);
    }

    #[test]
    fn hardware_program_switch_is_reported() {
        let plugin = Lpd8Mk2::new();
        let event = decode(&plugin, &[0xc0, 0x01]).expect("program change");
        assert_eq!(
            RawInputEvent::BankReported {
                ts: TimeStamp::ZERO,
                bank_id: "program_2".into(),
            },
            event,
        );
        assert!(decode(&plugin, &[0xc0, 0x07]).is_none());
    }

    #[test]
    fn led_update_preserves_other_pads() {
        let plugin = Lpd8Mk2::new();
        let state = FeedbackState {
            is_on: true,
            value: 127,
            color: Some(Color::RED),
        };
        let first = plugin
            .encode(&"program_1".into(), &"pad_1".into(), &state)
            .expect("sysex");
        // Framing plus command header plus 8 pads x 3 components x 2 bytes.
        assert_eq!(2 + 6 + 48, first.bytes.len());
        assert_eq!(
            &[0xf0, SYSEX_MANUFACTURER, SYSEX_DEVICE_ID, SYSEX_PRODUCT_ID, SYSEX_LED_CMD],
            &first.bytes[..5],
        );

        let second = plugin
            .encode(&"program_1".into(), &"pad_2".into(), &state)
            .expect("sysex");
        // Pad 1's color survives the second update.
        assert_eq!(first.bytes[8], second.bytes[8]);
        assert_eq!(Color::RED.red & 0x7f, second.bytes[8]);
    }

    #[test]
    fn switch_command_is_a_program_change() {
        let plugin = Lpd8Mk2::new();
        assert_eq!(
            Some(WireMessage::program_change(2, 2)),
            plugin.switch_bank_command(&"program_3".into()),
        );
        assert_eq!(None, plugin.switch_bank_command(&"program_9".into()));
    }

    #[test]
    fn knob_traffic_decodes_to_continuous_controls() {
        let plugin = Lpd8Mk2::new();
        let RawInputEvent::Control {
            control_id, value, ..
        } = decode(&plugin, &[0xb0, 1, 64]).expect("knob 1")
        else {
            panic!("control event expected");
        };
        assert_eq!(ControlId::from("knob_1"), control_id);
        assert_eq!(64, value);
    }
}
