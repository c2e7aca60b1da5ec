// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;


/// Identifier of a single control.
///
/// Unique within the namespace of one bank. The same id may denote
/// different physical controls in different banks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub struct ControlId(Cow<'static, str>);

impl ControlId {
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ControlId {
    fn from(id: &'static str) -> Self {
        Self(id.into())
    }
}

impl From<String> for ControlId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

/// The three fundamental control kinds.
///
/// Fixed when the control is created, never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum ControlType {
    /// Binary on/off state, flipped by each press.
    Toggle,
    /// Trigger-only, no persistent on/off state.
    Momentary,
    /// Range-based value (knobs, faders).
    Continuous,
}

/// Per-control hardware capability declarations.
///
/// Declared by the owning plugin when the control is registered and
/// immutable afterwards. Most controllers have asymmetric capabilities:
/// they send input but accept little or no feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    /// The control can receive state feedback at all.
    pub supports_feedback: bool,

    /// The hardware does not manage its own LEDs; the library must
    /// re-emit feedback whenever the logical state changes.
    pub requires_feedback: bool,

    /// The control has an LED.
    pub supports_led: bool,

    /// The LED supports more than on/off.
    pub supports_color: bool,

    /// The control's value can be set from software (motorized or
    /// LED-ring hardware).
    pub supports_value_setting: bool,
}

/// RGB LED color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const OFF: Self = Self::rgb(0x00, 0x00, 0x00);
    pub const RED: Self = Self::rgb(0x7f, 0x00, 0x00);
    pub const GREEN: Self = Self::rgb(0x00, 0x7f, 0x00);
    pub const BLUE: Self = Self::rgb(0x00, 0x00, 0x7f);
    pub const AMBER: Self = Self::rgb(0x7f, 0x3f, 0x00);
    pub const WHITE: Self = Self::rgb(0x7f, 0x7f, 0x7f);

    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Metadata defining a control: identity, kind, capabilities, range.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDefinition {
    pub id: ControlId,
    pub control_type: ControlType,
    pub capabilities: CapabilitySet,

    /// Grouping for category-scoped observers, e.g. "pad" or "transport".
    pub category: Option<Cow<'static, str>>,

    /// Upper bound of the raw value range `[0, max_value]`.
    pub max_value: u16,

    pub on_color: Option<Color>,
    pub off_color: Option<Color>,

    /// Whether the control's state is known at creation time.
    ///
    /// Continuous controls never are: their position is unknown until the
    /// first input event arrives. Switches may start as known-off when the
    /// device resets them on connect.
    pub starts_discovered: bool,
}

impl ControlDefinition {
    #[must_use]
    pub fn new(id: impl Into<ControlId>, control_type: ControlType) -> Self {
        Self {
            id: id.into(),
            control_type,
            capabilities: CapabilitySet::default(),
            category: None,
            max_value: 127,
            on_color: None,
            off_color: None,
            starts_discovered: !matches!(control_type, ControlType::Continuous),
        }
    }
}

/// Current state of one control.
///
/// Mutated exclusively by the engine; observers only ever see clones.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    is_on: bool,
    value: u16,
    normalized_value: f32,
    color: Option<Color>,
    off_color: Option<Color>,
    is_discovered: bool,
}

impl ControlState {
    fn initial(definition: &ControlDefinition) -> Self {
        Self {
            is_on: false,
            value: 0,
            normalized_value: 0.0,
            color: definition.off_color,
            off_color: definition.off_color,
            is_discovered: definition.starts_discovered
                && !matches!(definition.control_type, ControlType::Continuous),
        }
    }

    /// Whether at least one real input event has been observed.
    #[must_use]
    pub const fn is_discovered(&self) -> bool {
        self.is_discovered
    }

    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.is_on
    }

    /// Raw value, or `None` while the control is undiscovered.
    #[must_use]
    pub const fn value(&self) -> Option<u16> {
        if self.is_discovered {
            Some(self.value)
        } else {
            None
        }
    }

    /// Normalized value in `[0, 1]`, or `None` while undiscovered.
    #[must_use]
    pub const fn normalized_value(&self) -> Option<f32> {
        if self.is_discovered {
            Some(self.normalized_value)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn color(&self) -> Option<Color> {
        self.color
    }

    #[must_use]
    pub const fn off_color(&self) -> Option<Color> {
        self.off_color
    }
}

/// Partial state-change request.
///
/// Unset fields are left unchanged by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateUpdate {
    pub is_on: Option<bool>,
    pub value: Option<u16>,
    pub color: Option<Color>,
    pub off_color: Option<Color>,
}

impl StateUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_on.is_none()
            && self.value.is_none()
            && self.color.is_none()
            && self.off_color.is_none()
    }
}

/// What changed in a single accepted mutation.
///
/// An empty delta means the originating event was a no-op and no
/// notification is dispatched for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateDelta {
    pub is_on: Option<bool>,
    /// New raw and normalized value.
    pub value: Option<(u16, f32)>,
    pub color: Option<Color>,
    pub off_color: Option<Color>,
    /// Press edge of a momentary control. Transient, not persisted.
    pub triggered: bool,
    /// The mutation performed the one-way `undiscovered -> discovered`
    /// transition.
    pub discovered: bool,
}

impl StateDelta {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_on.is_none()
            && self.value.is_none()
            && self.color.is_none()
            && self.off_color.is_none()
            && !self.triggered
            && !self.discovered
    }
}

/// One addressable input/output element together with its current state.
///
/// Owned exclusively by the engine, which is the only writer.
#[derive(Debug)]
pub struct Control {
    definition: ControlDefinition,
    state: ControlState,
    last_input: Option<u16>,
}

impl Control {
    #[must_use]
    pub fn new(definition: ControlDefinition) -> Self {
        let state = ControlState::initial(&definition);
        Self {
            definition,
            state,
            last_input: None,
        }
    }

    #[must_use]
    pub const fn definition(&self) -> &ControlDefinition {
        &self.definition
    }

    #[must_use]
    pub const fn state(&self) -> &ControlState {
        &self.state
    }

    fn normalize(&self, value: u16) -> f32 {
        let max = self.definition.max_value;
        if max == 0 {
            return 0.0;
        }
        (f32::from(value.min(max)) / f32::from(max)).clamp(0.0, 1.0)
    }

    /// Apply a raw input value and return what changed.
    ///
    /// The first real input performs the discovery transition. Events
    /// that map to no observable change yield an empty delta.
    pub(crate) fn apply_input(&mut self, value: u16) -> StateDelta {
        let duplicate = self.last_input == Some(value);
        self.last_input = Some(value);
        let mut delta = StateDelta::default();
        if !self.state.is_discovered {
            self.state.is_discovered = true;
            delta.discovered = true;
        }
        match self.definition.control_type {
            ControlType::Toggle => {
                // Flip on press, ignore the release edge.
                if value > 0 {
                    let is_on = !self.state.is_on;
                    self.state.is_on = is_on;
                    self.state.value = value;
                    self.state.color = if is_on {
                        self.definition.on_color
                    } else {
                        self.definition.off_color
                    };
                    delta.is_on = Some(is_on);
                    delta.color = self.state.color;
                }
            }
            ControlType::Momentary => {
                if duplicate {
                    return StateDelta {
                        discovered: delta.discovered,
                        ..Default::default()
                    };
                }
                let pressed = value > 0;
                self.state.is_on = pressed;
                self.state.value = value;
                self.state.color = if pressed {
                    self.definition.on_color
                } else {
                    self.definition.off_color
                };
                delta.is_on = Some(pressed);
                delta.color = self.state.color;
                delta.triggered = pressed;
            }
            ControlType::Continuous => {
                if duplicate && !delta.discovered {
                    return delta;
                }
                let value = value.min(self.definition.max_value);
                let normalized = self.normalize(value);
                if self.state.value != value || delta.discovered {
                    self.state.value = value;
                    self.state.normalized_value = normalized;
                    delta.value = Some((value, normalized));
                }
            }
        }
        delta
    }

    /// Apply an already-validated partial update and return what changed.
    ///
    /// Commands never perform the discovery transition; that is reserved
    /// for real hardware input.
    pub(crate) fn apply_update(&mut self, update: &StateUpdate) -> StateDelta {
        let mut delta = StateDelta::default();
        if let Some(is_on) = update.is_on {
            if self.state.is_on != is_on {
                self.state.is_on = is_on;
                self.state.color = if is_on {
                    self.definition.on_color
                } else {
                    self.definition.off_color
                };
                delta.is_on = Some(is_on);
                delta.color = self.state.color;
            }
        }
        if let Some(value) = update.value {
            let value = value.min(self.definition.max_value);
            if self.state.value != value {
                let normalized = self.normalize(value);
                self.state.value = value;
                self.state.normalized_value = normalized;
                delta.value = Some((value, normalized));
            }
        }
        if let Some(color) = update.color {
            if self.state.color != Some(color) {
                self.state.color = Some(color);
                delta.color = Some(color);
            }
        }
        if let Some(off_color) = update.off_color {
            if self.state.off_color != Some(off_color) {
                self.state.off_color = Some(off_color);
                delta.off_color = Some(off_color);
            }
        }
        delta
    }
}
