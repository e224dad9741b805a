//! Hook registration
//!
//! The registry records which handler serves each intercepted syscall
//! number. Redirecting the real syscall entry to [`HookRegistry::invoke`] is
//! left to the platform's interception mechanism.

use log::info;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::{DeceptionEngine, SyscallCall, SyscallHandler, SyscallResult};
use crate::error::{DeceptionError, Result};
use crate::rules::SyscallId;
use crate::syscalls::MAX_SYSCALL;

#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<BTreeMap<SyscallId, Arc<dyn SyscallHandler>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooked", &self.hooked())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `syscall_id` to `handler`, replacing any previous handler
    pub fn install_hook(&self, syscall_id: SyscallId, handler: Arc<dyn SyscallHandler>) -> Result<()> {
        if syscall_id >= MAX_SYSCALL {
            return Err(DeceptionError::invalid(format!(
                "syscall {} out of range",
                syscall_id
            )));
        }

        let name = handler.name();
        self.hooks.write().insert(syscall_id, handler);
        info!("hooked syscall {} ({})", syscall_id, name);
        Ok(())
    }

    /// Unhook `syscall_id`; unhooking twice is harmless
    pub fn remove_hook(&self, syscall_id: SyscallId) -> bool {
        let removed = self.hooks.write().remove(&syscall_id).is_some();
        if removed {
            info!("unhooked syscall {}", syscall_id);
        }
        removed
    }

    pub fn is_hooked(&self, syscall_id: SyscallId) -> bool {
        self.hooks.read().contains_key(&syscall_id)
    }

    /// Hooked syscall numbers, ascending
    pub fn hooked(&self) -> Vec<SyscallId> {
        self.hooks.read().keys().copied().collect()
    }

    /// Drop every hook
    pub fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.hooks.write());
        for syscall_id in drained.keys() {
            info!("unhooked syscall {}", syscall_id);
        }
    }

    /// Entry point for an intercepted call
    pub fn invoke(
        &self,
        engine: &DeceptionEngine,
        syscall_id: SyscallId,
        call: &mut SyscallCall<'_>,
    ) -> SyscallResult {
        let handler = self.hooks.read().get(&syscall_id).cloned().ok_or_else(|| {
            DeceptionError::invalid(format!("syscall {} is not hooked", syscall_id))
        })?;

        engine.dispatch(syscall_id, handler.as_ref(), call)
    }
}
