// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;

use crate::{
    validate, BankError, BankId, BankResolver, Control, ControlId, ControlState, ControlType,
    ControllerPlugin, DispatchHub, FeedbackState, Layout, MidiTransport, Notification, OutputError,
    RawInputEvent, StateDelta, StateUpdate, ValidationMode, WireMessage,
};

#[cfg(test)]
mod tests;

/// Bound of the in-memory change log.
const CHANGE_LOG_CAPACITY: usize = 1024;

/// When feedback wire commands for `requires_feedback` controls are
/// handed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedbackPolicy {
    /// Before `apply_input`/`apply_command` returns.
    #[default]
    Immediate,
    /// Queued until the next `process_events` drain.
    Deferred,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown control: {0}")]
    UnknownControl(ControlId),
    #[error("field not applicable to {control_type:?} control {control_id}")]
    TypeMismatch {
        control_id: ControlId,
        control_type: ControlType,
    },
    #[error(transparent)]
    Capability(#[from] validate::CapabilityError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

type SharedTransport = Arc<Mutex<dyn MidiTransport>>;

struct EngineState {
    banks: HashMap<BankId, HashMap<ControlId, Control>>,
    resolver: BankResolver,
    change_log: VecDeque<(ControlId, StateDelta)>,
    pending_output: VecDeque<WireMessage>,
}

impl EngineState {
    fn resolve(&self, control_id: &ControlId) -> Option<&Control> {
        self.banks
            .get(self.resolver.active_bank())
            .and_then(|controls| controls.get(control_id))
    }

    fn resolve_mut(&mut self, control_id: &ControlId) -> Option<&mut Control> {
        self.banks
            .get_mut(self.resolver.active_bank())
            .and_then(|controls| controls.get_mut(control_id))
    }

    fn log_change(&mut self, control_id: &ControlId, delta: StateDelta) {
        if self.change_log.len() == CHANGE_LOG_CAPACITY {
            self.change_log.pop_front();
        }
        self.change_log.push_back((control_id.clone(), delta));
    }
}

/// Outcome of one committed mutation, assembled under the state lock
/// and acted upon after it is released.
struct Committed {
    notification: Notification,
    feedback: Option<WireMessage>,
    bank_switched: Option<BankId>,
}

/// Owns every [`Control`] of the session and is their single writer.
///
/// Raw input events and outbound commands both funnel through here;
/// accepted changes are appended to the change log and fanned out
/// through the [`DispatchHub`] after the mutation is committed, so
/// observers and `state()` callers always agree.
#[allow(missing_debug_implementations)]
pub struct ControlStateEngine {
    plugin: Arc<dyn ControllerPlugin>,
    hub: Arc<DispatchHub>,
    output: Option<SharedTransport>,
    feedback_policy: FeedbackPolicy,
    state: Mutex<EngineState>,
}

impl ControlStateEngine {
    /// Build the engine from a (config-resolved) layout.
    ///
    /// All controls are created here, once; the set never changes for
    /// the lifetime of the session.
    #[must_use]
    pub fn new(
        plugin: Arc<dyn ControllerPlugin>,
        hub: Arc<DispatchHub>,
        layout: Layout,
        output: Option<SharedTransport>,
        feedback_policy: FeedbackPolicy,
    ) -> Self {
        let Layout {
            switch_mode,
            initial_bank,
            banks,
        } = layout;
        let bank_ids: Vec<_> = banks.iter().map(|(bank_id, _)| bank_id.clone()).collect();
        let banks = banks
            .into_iter()
            .map(|(bank_id, definitions)| {
                let mut controls = HashMap::with_capacity(definitions.len());
                for definition in definitions {
                    let control_id = definition.id.clone();
                    if controls
                        .insert(control_id.clone(), Control::new(definition))
                        .is_some()
                    {
                        log::warn!("Duplicate control {control_id} in bank {bank_id}");
                    }
                }
                (bank_id, controls)
            })
            .collect();
        let resolver = BankResolver::new(bank_ids, initial_bank, switch_mode);
        Self {
            plugin,
            hub,
            output,
            feedback_policy,
            state: Mutex::new(EngineState {
                banks,
                resolver,
                change_log: VecDeque::with_capacity(CHANGE_LOG_CAPACITY),
                pending_output: VecDeque::new(),
            }),
        }
    }

    /// Apply one decoded input event.
    ///
    /// Returns `Ok(None)` when the event maps to no observable change
    /// (duplicate value, toggle release, repeated bank report).
    pub fn apply_input(&self, event: RawInputEvent) -> Result<Option<StateDelta>, EngineError> {
        match event {
            RawInputEvent::BankReported { bank_id, .. } => {
                let switched = {
                    let mut state = self.lock_state();
                    state.resolver.device_reported_bank(&bank_id)?
                };
                if switched {
                    self.hub.notify_bank(&bank_id);
                }
                Ok(None)
            }
            RawInputEvent::Control {
                control_id,
                value,
                bank_id,
                ..
            } => {
                let committed = {
                    let mut state = self.lock_state();
                    // A bank hint embedded in control traffic doubles as a
                    // device bank report.
                    let mut bank_switched = None;
                    if let Some(bank_id) = bank_id {
                        if state.resolver.device_reported_bank(&bank_id)? {
                            bank_switched = Some(bank_id);
                        }
                    }
                    let Some(control) = state.resolve_mut(&control_id) else {
                        return Err(EngineError::UnknownControl(control_id));
                    };
                    let delta = control.apply_input(value);
                    if delta.is_empty() {
                        drop(state);
                        if let Some(bank_id) = bank_switched {
                            self.hub.notify_bank(&bank_id);
                        }
                        return Ok(None);
                    }
                    self.commit(&mut state, &control_id, delta, bank_switched)
                };
                let delta = committed.notification.delta;
                self.finish(committed)?;
                Ok(Some(delta))
            }
        }
    }

    /// Validate and apply an outbound state command.
    ///
    /// Structural errors (`UnknownControl`, `TypeMismatch`) are hard
    /// failures in both modes; capability violations degrade to partial
    /// application in permissive mode.
    pub fn apply_command(
        &self,
        control_id: &ControlId,
        update: &StateUpdate,
        mode: ValidationMode,
    ) -> Result<StateDelta, EngineError> {
        let committed = {
            let mut state = self.lock_state();
            let Some(control) = state.resolve_mut(control_id) else {
                return Err(EngineError::UnknownControl(control_id.clone()));
            };
            let definition = control.definition();
            Self::check_applicable(control_id, definition.control_type, update)?;
            let accepted = validate::validate(&definition.capabilities, update, mode)?;
            let delta = control.apply_update(&accepted);
            if delta.is_empty() {
                return Ok(delta);
            }
            self.commit(&mut state, control_id, delta, None)
        };
        let delta = committed.notification.delta;
        self.finish(committed)?;
        Ok(delta)
    }

    /// Whether `apply_command` would accept the update in strict mode.
    ///
    /// Never errors and never mutates.
    #[must_use]
    pub fn can_set_state(&self, control_id: &ControlId, update: &StateUpdate) -> bool {
        let state = self.lock_state();
        let Some(control) = state.resolve(control_id) else {
            return false;
        };
        let definition = control.definition();
        Self::check_applicable(control_id, definition.control_type, update).is_ok()
            && validate::validate(&definition.capabilities, update, ValidationMode::Strict).is_ok()
    }

    /// Snapshot of a control's current state in the active bank.
    #[must_use]
    pub fn state(&self, control_id: &ControlId) -> Option<ControlState> {
        let state = self.lock_state();
        state.resolve(control_id).map(|control| control.state().clone())
    }

    /// Software-initiated bank switch.
    pub fn switch_bank(&self, bank_id: &BankId) -> Result<(), EngineError> {
        let (switched, command) = {
            let mut state = self.lock_state();
            let switched = state.resolver.request_switch(bank_id)?;
            let command = if switched {
                let command = self.plugin.switch_bank_command(bank_id);
                if let (Some(command), FeedbackPolicy::Deferred) =
                    (&command, self.feedback_policy)
                {
                    state.pending_output.push_back(command.clone());
                }
                command
            } else {
                None
            };
            (switched, command)
        };
        if let (Some(command), FeedbackPolicy::Immediate) = (command, self.feedback_policy) {
            self.send(&command)?;
        }
        if switched {
            self.hub.notify_bank(bank_id);
        }
        Ok(())
    }

    #[must_use]
    pub fn active_bank(&self) -> BankId {
        self.lock_state().resolver.active_bank().clone()
    }

    /// Ids of controls in the active bank whose state is known.
    #[must_use]
    pub fn discovered_controls(&self) -> Vec<ControlId> {
        self.controls_by_discovery(true)
    }

    /// Ids of controls in the active bank not yet interacted with.
    #[must_use]
    pub fn undiscovered_controls(&self) -> Vec<ControlId> {
        self.controls_by_discovery(false)
    }

    /// Most recent accepted changes, oldest first.
    #[must_use]
    pub fn change_log(&self, limit: usize) -> Vec<(ControlId, StateDelta)> {
        let state = self.lock_state();
        let skip = state.change_log.len().saturating_sub(limit);
        state.change_log.iter().skip(skip).cloned().collect()
    }

    /// Drain feedback messages queued under the deferred policy.
    #[must_use]
    pub fn take_pending_output(&self) -> Vec<WireMessage> {
        self.lock_state().pending_output.drain(..).collect()
    }

    fn controls_by_discovery(&self, discovered: bool) -> Vec<ControlId> {
        let state = self.lock_state();
        state
            .banks
            .get(state.resolver.active_bank())
            .map(|controls| {
                controls
                    .iter()
                    .filter(|(_, control)| control.state().is_discovered() == discovered)
                    .map(|(control_id, _)| control_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_applicable(
        control_id: &ControlId,
        control_type: ControlType,
        update: &StateUpdate,
    ) -> Result<(), EngineError> {
        let mismatch = match control_type {
            ControlType::Toggle | ControlType::Momentary => update.value.is_some(),
            ControlType::Continuous => update.is_on.is_some(),
        };
        if mismatch {
            return Err(EngineError::TypeMismatch {
                control_id: control_id.clone(),
                control_type,
            });
        }
        Ok(())
    }

    /// Record an accepted mutation: change log entry, feedback message
    /// where the hardware needs one, notification payload. Runs under
    /// the state lock; nothing here may touch I/O or observers.
    fn commit(
        &self,
        state: &mut MutexGuard<'_, EngineState>,
        control_id: &ControlId,
        delta: StateDelta,
        bank_switched: Option<BankId>,
    ) -> Committed {
        state.log_change(control_id, delta);
        let active_bank = state.resolver.active_bank().clone();
        let control = state.resolve(control_id).expect("control resolved above");
        let definition = control.definition();
        let feedback = if definition.capabilities.requires_feedback {
            self.plugin.encode(
                &active_bank,
                control_id,
                &FeedbackState {
                    is_on: control.state().is_on(),
                    value: control.state().value().unwrap_or(0),
                    color: control.state().color(),
                },
            )
        } else {
            None
        };
        let notification = Notification {
            control_id: control_id.clone(),
            control_type: definition.control_type,
            category: definition.category.clone(),
            state: control.state().clone(),
            delta,
        };
        if let (Some(feedback), FeedbackPolicy::Deferred) = (&feedback, self.feedback_policy) {
            state.pending_output.push_back(feedback.clone());
        }
        Committed {
            notification,
            feedback,
            bank_switched,
        }
    }

    /// Emit feedback and notifications for a committed mutation.
    /// Runs after the state lock is released.
    fn finish(&self, committed: Committed) -> Result<(), EngineError> {
        let Committed {
            notification,
            feedback,
            bank_switched,
        } = committed;
        if let (Some(feedback), FeedbackPolicy::Immediate) = (feedback, self.feedback_policy) {
            self.send(&feedback)?;
        }
        if let Some(bank_id) = bank_switched {
            self.hub.notify_bank(&bank_id);
        }
        self.hub.notify(&notification);
        Ok(())
    }

    fn send(&self, message: &WireMessage) -> Result<(), EngineError> {
        let Some(output) = &self.output else {
            return Ok(());
        };
        let mut output = output.lock().unwrap_or_else(PoisonError::into_inner);
        output.send(message)?;
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
