// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;

use thiserror::Error;

/// Identifier of a bank (also called a layer on some devices).
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub struct BankId(Cow<'static, str>);

impl BankId {
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for BankId {
    fn from(id: &'static str) -> Self {
        Self(id.into())
    }
}

impl From<String> for BankId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

/// Who is in charge of switching banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankSwitchMode {
    /// The device switches banks itself and only reports the result.
    /// Software-initiated switching is unavailable.
    Hardware,
    /// The library may request a switch; the plugin emits the
    /// device-specific switch command.
    Software,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("unknown bank: {0}")]
    UnknownBank(BankId),
    #[error("bank switching is managed by the hardware")]
    UnsupportedOperation,
}

/// Tracks which bank is active and arbitrates who may change that.
///
/// The resolver only manages addressing state; the engine owns the
/// controls living in each bank's namespace.
#[derive(Debug)]
pub struct BankResolver {
    banks: Vec<BankId>,
    active: BankId,
    switch_mode: BankSwitchMode,
}

impl BankResolver {
    /// `banks` must contain `initial`.
    #[must_use]
    pub fn new(banks: Vec<BankId>, initial: BankId, switch_mode: BankSwitchMode) -> Self {
        debug_assert!(banks.contains(&initial));
        Self {
            banks,
            active: initial,
            switch_mode,
        }
    }

    #[must_use]
    pub fn active_bank(&self) -> &BankId {
        &self.active
    }

    #[must_use]
    pub const fn switch_mode(&self) -> BankSwitchMode {
        self.switch_mode
    }

    #[must_use]
    pub fn banks(&self) -> &[BankId] {
        &self.banks
    }

    #[must_use]
    pub fn contains(&self, bank_id: &BankId) -> bool {
        self.banks.contains(bank_id)
    }

    /// Software-initiated switch request.
    ///
    /// Returns `true` if the active bank actually changed. Fails on
    /// hardware-managed devices and on unknown bank ids.
    pub fn request_switch(&mut self, bank_id: &BankId) -> Result<bool, BankError> {
        match self.switch_mode {
            BankSwitchMode::Hardware => Err(BankError::UnsupportedOperation),
            BankSwitchMode::Software => {
                if !self.contains(bank_id) {
                    return Err(BankError::UnknownBank(bank_id.clone()));
                }
                if &self.active == bank_id {
                    return Ok(false);
                }
                self.active = bank_id.clone();
                Ok(true)
            }
        }
    }

    /// The device reported which bank it considers active.
    ///
    /// Returns `true` if this changed the tracked bank. Reports of
    /// unknown banks indicate a plugin defect and are rejected.
    pub fn device_reported_bank(&mut self, bank_id: &BankId) -> Result<bool, BankError> {
        if !self.contains(bank_id) {
            return Err(BankError::UnknownBank(bank_id.clone()));
        }
        if &self.active == bank_id {
            return Ok(false);
        }
        self.active = bank_id.clone();
        Ok(true)
    }
}
