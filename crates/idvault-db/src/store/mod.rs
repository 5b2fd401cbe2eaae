//! SurrealDB implementations of the identity stores.

mod propagation;
mod role;
mod user;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use idvault_core::error::{IdentityError, IdentityResult};

pub use role::SurrealRoleStore;
pub use user::SurrealUserStore;

/// Disposed state shared by every clone of a store.
#[derive(Debug, Clone, Default)]
pub(crate) struct DisposeFlag(Arc<AtomicBool>);

impl DisposeFlag {
    pub(crate) fn dispose(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn check(&self, store: &'static str) -> IdentityResult<()> {
        if self.0.load(Ordering::Acquire) {
            return Err(IdentityError::Disposed { store });
        }
        Ok(())
    }
}
