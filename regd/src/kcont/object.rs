//! A single KCONT entry: a page-backed region plus the dual refcounts the original driver
//! tracked with two `refcount_t`s (`c->refs`, `c->user_refs`).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::region::Region;

/// `kernel_refs` starts at 1 for the registry's own slot; each outstanding `GET_FD` descriptor
/// adds one more to both `kernel_refs` and `user_refs`, and `RELEASE_FD` takes it back off.
/// `DESTROY` only succeeds when `user_refs` is zero, `FORCE_DESTROY` never checks either.
pub struct KcontObject {
    pub id: u64,
    pub region: Region,
    kernel_refs: AtomicU64,
    user_refs: AtomicU64,
}

impl KcontObject {
    pub fn new(id: u64, region: Region) -> Self {
        Self { id, region, kernel_refs: AtomicU64::new(1), user_refs: AtomicU64::new(0) }
    }

    pub fn user_refs(&self) -> u64 {
        self.user_refs.load(Ordering::Acquire)
    }

    pub fn kernel_refs(&self) -> u64 {
        self.kernel_refs.load(Ordering::Acquire)
    }

    /// Accounts for one newly handed-out descriptor.
    pub fn get_user(&self) {
        self.kernel_refs.fetch_add(1, Ordering::AcqRel);
        self.user_refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Undoes [`get_user`] — used both by `RELEASE_FD` and by the `GET_FD` rollback path when
    /// no descriptor slot is actually available for the reply frame.
    pub fn put_user(&self) {
        self.kernel_refs.fetch_sub(1, Ordering::AcqRel);
        self.user_refs.fetch_sub(1, Ordering::AcqRel);
    }
}
