// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use crate::{CapabilitySet, StateUpdate};

/// How capability violations are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Any violation rejects the whole update; nothing is applied.
    #[default]
    Strict,
    /// Violating fields are dropped with a warning; the rest is applied.
    Permissive,
}

/// A requested operation exceeds the control's declared capabilities.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("control does not support feedback")]
    UnsupportedFeedback,
    #[error("control does not support color")]
    UnsupportedColor,
    #[error("control does not support value setting")]
    UnsupportedValueSet,
}

const fn check(capabilities: &CapabilitySet, update: &StateUpdate) -> Result<(), CapabilityError> {
    if update.is_on.is_some() && !(capabilities.supports_feedback || capabilities.supports_led) {
        return Err(CapabilityError::UnsupportedFeedback);
    }
    if (update.color.is_some() || update.off_color.is_some()) && !capabilities.supports_color {
        return Err(CapabilityError::UnsupportedColor);
    }
    if update.value.is_some() && !capabilities.supports_value_setting {
        return Err(CapabilityError::UnsupportedValueSet);
    }
    Ok(())
}

/// Validate a requested update against a capability set.
///
/// Returns the update that may actually be applied. In strict mode the
/// first violation fails the whole request. In permissive mode violating
/// fields are stripped and logged, and the remainder is returned.
///
/// Deterministic function of (capabilities, requested fields).
pub fn validate(
    capabilities: &CapabilitySet,
    update: &StateUpdate,
    mode: ValidationMode,
) -> Result<StateUpdate, CapabilityError> {
    match mode {
        ValidationMode::Strict => check(capabilities, update).map(|()| *update),
        ValidationMode::Permissive => {
            let mut accepted = *update;
            if update.is_on.is_some()
                && !(capabilities.supports_feedback || capabilities.supports_led)
            {
                log::warn!("Dropping unsupported feedback request");
                accepted.is_on = None;
            }
            if (update.color.is_some() || update.off_color.is_some())
                && !capabilities.supports_color
            {
                log::warn!("Dropping unsupported color request");
                accepted.color = None;
                accepted.off_color = None;
            }
            if update.value.is_some() && !capabilities.supports_value_setting {
                log::warn!("Dropping unsupported value request");
                accepted.value = None;
            }
            Ok(accepted)
        }
    }
}
