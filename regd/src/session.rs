//! Per-connection VARS state: the container a client has bound via `OPEN_CONTAINER`.
//!
//! The original stashed the bound container directly in `file->private_data` and released it
//! in `varser_release`, the file-close callback — here a `tokio::net::UnixStream` connection
//! is the equivalent unit of lifetime, and `Drop` plays the same role `varser_release` did,
//! so an abnormal disconnect can't leak a container's open-count.

use std::sync::{Arc, Mutex};

use shared::IpcError;

use crate::vars::{Container, VarsRegistry};

pub struct VarsSession {
    registry: Arc<VarsRegistry>,
    bound: Mutex<Option<Arc<Container>>>,
}

impl VarsSession {
    pub fn new(registry: Arc<VarsRegistry>) -> Self {
        Self { registry, bound: Mutex::new(None) }
    }

    /// `VARSER_IOC_OPEN_CONTAINER`. Fails `INVAL` if the session is already bound, leaving
    /// the existing binding untouched — the original's unconditional
    /// `file->private_data = c` assignment instead silently dropped the previous binding's
    /// reference, a leak this reimplementation does not reproduce.
    pub fn open(&self, name: &str) -> Result<(), IpcError> {
        let container = self.registry.open(name)?;
        let mut bound = self.bound.lock().unwrap();
        if bound.is_some() {
            self.registry.close(&container);
            return Err(IpcError::InvalidArgument);
        }
        *bound = Some(container);
        Ok(())
    }

    /// `VARSER_IOC_CLOSE_CONTAINER`.
    pub fn close(&self) -> Result<(), IpcError> {
        let mut bound = self.bound.lock().unwrap();
        let container = bound.take().ok_or(IpcError::InvalidArgument)?;
        self.registry.close(&container);
        Ok(())
    }

    /// The container bound by the most recent `OPEN_CONTAINER`, for `CLOSE_CONTAINER`'s own
    /// introspection needs. `GET`/`SET` use [`bound_container_for_access`] instead.
    pub fn bound_container(&self) -> Result<Arc<Container>, IpcError> {
        self.bound.lock().unwrap().clone().ok_or(IpcError::InvalidArgument)
    }

    /// The container bound by the most recent `OPEN_CONTAINER`, for `GET`/`SET`. Per the
    /// VARS operation table, these fail `NOENT` — not `INVAL` — when the session is unbound.
    pub fn bound_container_for_access(&self) -> Result<Arc<Container>, IpcError> {
        self.bound.lock().unwrap().clone().ok_or(IpcError::NotFound)
    }
}

impl Drop for VarsSession {
    fn drop(&mut self) {
        if let Some(container) = self.bound.lock().unwrap().take() {
            self.registry.close(&container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_a_bound_container() {
        let registry = Arc::new(VarsRegistry::new(8));
        registry.register("c1", &[]).unwrap();
        {
            let session = VarsSession::new(registry.clone());
            session.open("c1").unwrap();
            let container = session.bound_container().unwrap();
            assert_eq!(container.refs(), 1);
        }
        // the leaked session's drop released the only outstanding reference, unlinking "c1"
        assert_eq!(registry.open("c1").err(), Some(IpcError::NotFound));
    }

    #[test]
    fn reopening_while_bound_is_rejected_and_leaves_the_binding_untouched() {
        let registry = Arc::new(VarsRegistry::new(8));
        registry.register("c1", &[]).unwrap();
        registry.register("c2", &[]).unwrap();
        let session = VarsSession::new(registry.clone());
        session.open("c1").unwrap();

        assert_eq!(session.open("c2"), Err(IpcError::InvalidArgument));

        let bound = session.bound_container().unwrap();
        assert_eq!(bound.name, "c1");
        assert_eq!(bound.refs(), 1);
        // the rejected open's reference on "c2" was released, not leaked
        let c2 = registry.open("c2").unwrap();
        assert_eq!(c2.refs(), 1);
    }

    #[test]
    fn close_without_a_binding_is_invalid_argument() {
        let registry = Arc::new(VarsRegistry::new(8));
        let session = VarsSession::new(registry);
        assert_eq!(session.close(), Err(IpcError::InvalidArgument));
    }

    #[test]
    fn get_and_set_paths_see_not_found_when_unbound() {
        let registry = Arc::new(VarsRegistry::new(8));
        let session = VarsSession::new(registry);
        assert_eq!(session.bound_container_for_access().err(), Some(IpcError::NotFound));
    }
}
