use std::collections::BTreeSet;
use std::sync::Arc;

use foundation::ids::ContainerId;
use parking_lot::Mutex;

use crate::error::SessionError;

/// Page-wide record of which containers currently host a surface.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    claimed: Arc<Mutex<BTreeSet<ContainerId>>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, container: ContainerId) -> Result<ContainerLease, SessionError> {
        let mut claimed = self.claimed.lock();
        if !claimed.insert(container.clone()) {
            return Err(SessionError::ContainerInUse(container));
        }
        Ok(ContainerLease {
            container,
            registry: self.clone(),
        })
    }

    pub fn is_claimed(&self, container: &ContainerId) -> bool {
        self.claimed.lock().contains(container)
    }
}

/// Exclusive claim on a container; released on drop.
#[derive(Debug)]
pub struct ContainerLease {
    container: ContainerId,
    registry: ContainerRegistry,
}

impl ContainerLease {
    pub fn container(&self) -> &ContainerId {
        &self.container
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        self.registry.claimed.lock().remove(&self.container);
    }
}

#[cfg(test)]
mod tests {
    use super::ContainerRegistry;
    use crate::error::SessionError;
    use foundation::ids::ContainerId;

    #[test]
    fn second_claim_fails_until_release() {
        let reg = ContainerRegistry::new();
        let id = ContainerId::from("map");
        let lease = reg.claim(id.clone()).unwrap();
        assert_eq!(
            reg.claim(id.clone()).unwrap_err(),
            SessionError::ContainerInUse(id.clone())
        );
        drop(lease);
        assert!(!reg.is_claimed(&id));
        assert!(reg.claim(id).is_ok());
    }
}
