// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;

use thiserror::Error;

use crate::{BankId, Color, ControlDefinition, ControlType, Layout};

/// Per-control user override: type and colors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlConfig {
    /// Requested control type. Only the toggle/momentary pair is
    /// interchangeable; continuous behavior is fixed hardware behavior.
    pub control_type: Option<ControlType>,
    pub color: Option<Color>,
    pub off_color: Option<Color>,
}

/// Control overrides for one bank, keyed by control id or by a
/// trailing-`*` pattern ("pad_*" matches "pad_1", "pad_2", ...).
///
/// Entries are matched in order; exact ids take precedence over
/// patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankConfig {
    pub controls: Vec<(Cow<'static, str>, ControlConfig)>,
}

/// User configuration applied over the plugin's declared layout.
///
/// Bank-scoped entries win over flat entries; flat entries act as a
/// fallback for every bank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerConfig {
    pub banks: Vec<(BankId, BankConfig)>,
    pub controls: Vec<(Cow<'static, str>, ControlConfig)>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("control {control_id} has fixed {control_type:?} behavior")]
    UnsupportedTypeOverride {
        control_id: String,
        control_type: ControlType,
    },
}

fn matches_pattern(pattern: &str, control_id: &str) -> bool {
    pattern.strip_suffix('*').map_or_else(
        || pattern == control_id,
        |prefix| control_id.starts_with(prefix),
    )
}

fn find_config<'a>(
    entries: &'a [(Cow<'static, str>, ControlConfig)],
    control_id: &str,
) -> Option<&'a ControlConfig> {
    entries
        .iter()
        .find(|(pattern, _)| pattern.as_ref() == control_id)
        .or_else(|| {
            entries
                .iter()
                .find(|(pattern, _)| matches_pattern(pattern, control_id))
        })
        .map(|(_, config)| config)
}

impl ControllerConfig {
    fn resolve_control(
        &self,
        bank_id: &BankId,
        definition: &ControlDefinition,
    ) -> Result<ControlDefinition, ConfigError> {
        let bank_entries = self
            .banks
            .iter()
            .find(|(config_bank, _)| config_bank == bank_id)
            .map(|(_, bank_config)| bank_config.controls.as_slice());
        let config = bank_entries
            .and_then(|entries| find_config(entries, definition.id.as_str()))
            .or_else(|| find_config(&self.controls, definition.id.as_str()));
        let Some(config) = config else {
            return Ok(definition.clone());
        };

        let mut resolved = definition.clone();
        if let Some(control_type) = config.control_type {
            if control_type != definition.control_type {
                let interchangeable = matches!(
                    (definition.control_type, control_type),
                    (ControlType::Toggle, ControlType::Momentary)
                        | (ControlType::Momentary, ControlType::Toggle)
                );
                if !interchangeable {
                    return Err(ConfigError::UnsupportedTypeOverride {
                        control_id: definition.id.as_str().to_owned(),
                        control_type: definition.control_type,
                    });
                }
                resolved.control_type = control_type;
            }
        }
        if config.color.is_some() {
            resolved.on_color = config.color;
        }
        if config.off_color.is_some() {
            resolved.off_color = config.off_color;
        }
        Ok(resolved)
    }

    /// Apply the configured overrides to a plugin-declared layout.
    pub fn resolve_layout(&self, layout: Layout) -> Result<Layout, ConfigError> {
        let Layout {
            switch_mode,
            initial_bank,
            banks,
        } = layout;
        let banks = banks
            .into_iter()
            .map(|(bank_id, definitions)| {
                let definitions = definitions
                    .iter()
                    .map(|definition| self.resolve_control(&bank_id, definition))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((bank_id, definitions))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Layout {
            switch_mode,
            initial_bank,
            banks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BankSwitchMode;

    fn layout() -> Layout {
        Layout {
            switch_mode: BankSwitchMode::Hardware,
            initial_bank: "bank_1".into(),
            banks: vec![(
                "bank_1".into(),
                vec![
                    ControlDefinition::new("pad_1", ControlType::Toggle),
                    ControlDefinition::new("pad_2", ControlType::Toggle),
                    ControlDefinition::new("fader_1", ControlType::Continuous),
                ],
            )],
        }
    }

    fn definitions(layout: &Layout) -> &[ControlDefinition] {
        &layout.banks[0].1
    }

    #[test]
    fn exact_entry_wins_over_pattern() {
        let config = ControllerConfig {
            banks: vec![(
                "bank_1".into(),
                BankConfig {
                    controls: vec![
                        (
                            "pad_*".into(),
                            ControlConfig {
                                color: Some(Color::GREEN),
                                ..Default::default()
                            },
                        ),
                        (
                            "pad_2".into(),
                            ControlConfig {
                                color: Some(Color::RED),
                                ..Default::default()
                            },
                        ),
                    ],
                },
            )],
            ..Default::default()
        };
        let resolved = config.resolve_layout(layout()).unwrap();
        let definitions = definitions(&resolved);
        assert_eq!(Some(Color::GREEN), definitions[0].on_color);
        assert_eq!(Some(Color::RED), definitions[1].on_color);
    }

    #[test]
    fn flat_entries_are_a_fallback_for_all_banks() {
        let config = ControllerConfig {
            controls: vec![(
                "pad_*".into(),
                ControlConfig {
                    control_type: Some(ControlType::Momentary),
                    ..Default::default()
                },
            )],
            ..Default::default()
        };
        let resolved = config.resolve_layout(layout()).unwrap();
        let definitions = definitions(&resolved);
        assert_eq!(ControlType::Momentary, definitions[0].control_type);
        assert_eq!(ControlType::Momentary, definitions[1].control_type);
        assert_eq!(ControlType::Continuous, definitions[2].control_type);
    }

    #[test]
    fn continuous_type_is_not_overridable() {
        let config = ControllerConfig {
            controls: vec![(
                "fader_1".into(),
                ControlConfig {
                    control_type: Some(ControlType::Toggle),
                    ..Default::default()
                },
            )],
            ..Default::default()
        };
        assert_eq!(
            Err(ConfigError::UnsupportedTypeOverride {
                control_id: "fader_1".to_owned(),
                control_type: ControlType::Continuous,
            }),
            config.resolve_layout(layout()),
        );
    }

    #[test]
    fn unconfigured_controls_keep_plugin_defaults() {
        let config = ControllerConfig::default();
        let resolved = config.resolve_layout(layout()).unwrap();
        assert_eq!(layout().banks, resolved.banks);
    }
}
