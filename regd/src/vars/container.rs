//! A named VARS container: a fixed set of variables established once at `REGISTER` time
//! (original `struct varser_container`), plus the open-count the original tracked with a
//! `struct kref`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::vars::variable::Variable;

pub struct Container {
    pub name: String,
    vars: HashMap<String, Arc<Variable>>,
    /// Starts at 0 at `REGISTER`, matching `global_ref=0`. `OPEN_CONTAINER`/
    /// `CLOSE_CONTAINER` are the only operations that change it; the registry holds no
    /// permanent share of its own, so the last `close()` to bring this to zero is the
    /// container's last reference, not one of several.
    refs: AtomicU64,
}

impl Container {
    pub fn new(name: String, vars: HashMap<String, Arc<Variable>>) -> Self {
        Self { name, vars, refs: AtomicU64::new(0) }
    }

    pub fn var(&self, name: &str) -> Option<Arc<Variable>> {
        self.vars.get(name).cloned()
    }

    pub fn open(&self) {
        self.refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the open-count and returns the value after the decrement, so the caller
    /// can tell whether this was the last reference (original `varser_container_release`'s
    /// kref-zero callback).
    pub fn close(&self) -> u64 {
        self.refs.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn refs(&self) -> u64 {
        self.refs.load(Ordering::Acquire)
    }
}
