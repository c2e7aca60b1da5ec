// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    borrow::Cow,
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::{BankId, ControlId, ControlState, ControlType, StateDelta};


/// Opaque handle identifying one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub struct HandlerId(u64);

/// Immutable view of one accepted state change, handed to observers.
#[derive(Debug, Clone)]
pub struct Notification {
    pub control_id: ControlId,
    pub control_type: ControlType,
    pub category: Option<Cow<'static, str>>,
    /// Snapshot taken after the mutation was committed.
    pub state: ControlState,
    pub delta: StateDelta,
}

type ControlHandler = Arc<dyn Fn(&Notification) + Send + Sync + 'static>;
type BankHandler = Arc<dyn Fn(&BankId) + Send + Sync + 'static>;

#[derive(Default)]
struct Registry {
    by_control: HashMap<ControlId, Vec<(HandlerId, ControlHandler)>>,
    by_category: HashMap<Cow<'static, str>, Vec<(HandlerId, ControlHandler)>>,
    by_type: HashMap<ControlType, Vec<(HandlerId, ControlHandler)>>,
    global: Vec<(HandlerId, ControlHandler)>,
    bank: Vec<(HandlerId, BankHandler)>,
}

fn remove_handler<T>(handlers: &mut Vec<(HandlerId, T)>, handler_id: HandlerId) -> bool {
    let len = handlers.len();
    handlers.retain(|(id, _)| *id != handler_id);
    handlers.len() != len
}

/// Thread-safe observer registry with fault-isolated fan-out.
///
/// Registration and dispatch may happen concurrently from different
/// threads. Dispatch snapshots the matching handler lists under a read
/// lock and invokes them without holding any lock, so a slow or faulty
/// observer can neither block registration nor corrupt the registry.
#[allow(missing_debug_implementations)]
#[derive(Default)]
pub struct DispatchHub {
    registry: RwLock<Registry>,
    next_handler_id: AtomicU64,
}

impl DispatchHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> HandlerId {
        HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register an observer for every accepted state change.
    pub fn register_global(
        &self,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.write().global.push((id, Arc::new(handler)));
        id
    }

    /// Register an observer for all controls of one type.
    pub fn register_by_type(
        &self,
        control_type: ControlType,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.write()
            .by_type
            .entry(control_type)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Register an observer for all controls in one category.
    pub fn register_by_category(
        &self,
        category: impl Into<Cow<'static, str>>,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.write()
            .by_category
            .entry(category.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Register an observer for a single control.
    pub fn register_by_control(
        &self,
        control_id: impl Into<ControlId>,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.write()
            .by_control
            .entry(control_id.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Register an observer for bank switches.
    pub fn register_bank(&self, handler: impl Fn(&BankId) + Send + Sync + 'static) -> HandlerId {
        let id = self.next_id();
        self.write().bank.push((id, Arc::new(handler)));
        id
    }

    /// Remove a previously registered observer.
    ///
    /// Returns `false` if the handle is unknown (e.g. already removed).
    pub fn unregister(&self, handler_id: HandlerId) -> bool {
        let mut registry = self.write();
        let registry = &mut *registry;
        if remove_handler(&mut registry.global, handler_id)
            || remove_handler(&mut registry.bank, handler_id)
        {
            return true;
        }
        registry
            .by_control
            .values_mut()
            .chain(registry.by_category.values_mut())
            .chain(registry.by_type.values_mut())
            .any(|handlers| remove_handler(handlers, handler_id))
    }

    /// Fan a state change out to all matching observers.
    ///
    /// Invocation order is part of the contract: control-specific
    /// handlers first, then category, then type, then global. Each
    /// handler runs isolated; a panicking observer is logged and the
    /// remaining handlers still run.
    pub fn notify(&self, notification: &Notification) {
        let snapshot = {
            let registry = self.read();
            let mut snapshot = Vec::new();
            let mut collect = |scope: &'static str, handlers: Option<&Vec<(HandlerId, ControlHandler)>>| {
                if let Some(handlers) = handlers {
                    snapshot.extend(
                        handlers
                            .iter()
                            .map(|(_, handler)| (scope, Arc::clone(handler))),
                    );
                }
            };
            collect(
                "control",
                registry.by_control.get(&notification.control_id),
            );
            if let Some(category) = &notification.category {
                collect("category", registry.by_category.get(category));
            }
            collect("type", registry.by_type.get(&notification.control_type));
            collect("global", Some(&registry.global));
            snapshot
        };
        for (scope, handler) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(notification))).is_err() {
                log::error!(
                    "Observer fault in {scope} handler for control {control_id}",
                    control_id = notification.control_id,
                );
            }
        }
    }

    /// Fan a bank switch out to all bank observers.
    pub fn notify_bank(&self, bank_id: &BankId) {
        let snapshot: Vec<_> = {
            let registry = self.read();
            registry
                .bank
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(bank_id))).is_err() {
                log::error!("Observer fault in bank handler for bank {bank_id}");
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
