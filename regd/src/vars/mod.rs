//! VARS: the name-addressed container registry (original `varser.c`). Containers are
//! immutable after `REGISTER` — the original never grows or shrinks a container's variable
//! list after creation either — so each `Container` owns a plain `HashMap`, and only the
//! registry's container-name table and each variable's own data need runtime locking.

pub mod container;
pub mod variable;

pub use container::Container;
pub use variable::Variable;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared::wire::VarDesc;
use shared::{IpcError, TypeTag};

struct Inner {
    containers: HashMap<String, Arc<Container>>,
    /// Registration order, preserved for `LIST_CONTAINERS` (the original walked its
    /// containers in the same order they were linked in).
    order: Vec<String>,
}

pub struct VarsRegistry {
    inner: Mutex<Inner>,
    default_capacity: u32,
}

impl VarsRegistry {
    pub fn new(default_capacity: u32) -> Self {
        Self {
            inner: Mutex::new(Inner { containers: HashMap::new(), order: Vec::new() }),
            default_capacity,
        }
    }

    /// `VARSER_IOCTL_REGISTER`.
    pub fn register(&self, container_name: &str, descs: &[VarDesc]) -> Result<(), IpcError> {
        let mut vars = HashMap::with_capacity(descs.len());
        for desc in descs {
            if vars.contains_key(&desc.name) {
                return Err(IpcError::InvalidArgument);
            }
            let type_tag = TypeTag::from_wire(desc.type_tag).ok_or(IpcError::InvalidArgument)?;
            let size = type_tag
                .resolve_capacity(desc.capacity, self.default_capacity)
                .ok_or(IpcError::InvalidArgument)?;
            vars.insert(desc.name.clone(), Arc::new(Variable::new(desc.name.clone(), type_tag, size)));
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.containers.contains_key(container_name) {
            return Err(IpcError::AlreadyExists);
        }
        inner.containers.insert(container_name.to_string(), Arc::new(Container::new(container_name.to_string(), vars)));
        inner.order.push(container_name.to_string());
        Ok(())
    }

    /// `VARSER_IOC_OPEN_CONTAINER`. Binds the caller's session to the returned container; the
    /// session must balance this with [`close`](Self::close) (directly, or via its own
    /// `Drop`, mirroring `varser_release`).
    pub fn open(&self, container_name: &str) -> Result<Arc<Container>, IpcError> {
        let inner = self.inner.lock().unwrap();
        let container = inner.containers.get(container_name).ok_or(IpcError::NotFound)?;
        container.open();
        Ok(container.clone())
    }

    /// `VARSER_IOC_CLOSE_CONTAINER` / session teardown. When this is the last outstanding
    /// open, the container is unlinked from the table and its entry in `order` is dropped —
    /// the original's kref reaching zero and freeing the container, here realized as the
    /// registry's own `Arc` clone going away so the container's storage is freed once every
    /// session holding a reference has released it too.
    pub fn close(&self, container: &Container) {
        if container.close() == 0 {
            let mut inner = self.inner.lock().unwrap();
            inner.containers.remove(&container.name);
            inner.order.retain(|name| name != &container.name);
        }
    }

    /// `VARSER_IOC_LIST_CONTAINERS`, in registration order. Truncation to the wire buffer's
    /// capacity is the caller's job (`control::vars`), matching the original, which computed
    /// truncation against its 4096-byte stack buffer at the ioctl boundary, not in the
    /// container-list walk itself.
    pub fn list(&self) -> Vec<String> {
        self.inner.lock().unwrap().order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, type_tag: u8, capacity: u32) -> VarDesc {
        VarDesc { name: name.to_string(), type_tag, capacity }
    }

    #[test]
    fn register_then_open_then_get_variable() {
        let reg = VarsRegistry::new(8);
        reg.register("c1", &[desc("counter", TypeTag::I64.wire_value(), 0)]).unwrap();
        let container = reg.open("c1").unwrap();
        let var = container.var("counter").unwrap();
        assert_eq!(var.size(), 8);
    }

    #[test]
    fn register_rejects_duplicate_container_name() {
        let reg = VarsRegistry::new(8);
        reg.register("c1", &[]).unwrap();
        assert_eq!(reg.register("c1", &[]), Err(IpcError::AlreadyExists));
    }

    #[test]
    fn register_rejects_duplicate_var_name_within_one_call() {
        let reg = VarsRegistry::new(8);
        let descs = [desc("x", TypeTag::I32.wire_value(), 0), desc("x", TypeTag::I32.wire_value(), 0)];
        assert_eq!(reg.register("c1", &descs), Err(IpcError::InvalidArgument));
    }

    #[test]
    fn open_unknown_container_is_not_found() {
        let reg = VarsRegistry::new(8);
        assert_eq!(reg.open("missing").err(), Some(IpcError::NotFound));
    }

    #[test]
    fn open_increments_refs_and_close_decrements() {
        let reg = VarsRegistry::new(8);
        reg.register("c1", &[]).unwrap();
        let container = reg.open("c1").unwrap();
        assert_eq!(container.refs(), 1);
        reg.open("c1").unwrap();
        assert_eq!(container.refs(), 2);
        reg.close(&container);
        assert_eq!(container.refs(), 1);
    }

    #[test]
    fn close_on_the_last_reference_unlinks_the_container() {
        let reg = VarsRegistry::new(8);
        reg.register("c1", &[]).unwrap();
        let container = reg.open("c1").unwrap();
        reg.close(&container);
        assert_eq!(container.refs(), 0);
        assert_eq!(reg.open("c1").err(), Some(IpcError::NotFound));
        assert!(reg.list().is_empty());
    }

    #[test]
    fn list_preserves_registration_order() {
        let reg = VarsRegistry::new(8);
        reg.register("b", &[]).unwrap();
        reg.register("a", &[]).unwrap();
        assert_eq!(reg.list(), vec!["b".to_string(), "a".to_string()]);
    }
}
