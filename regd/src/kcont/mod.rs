//! KCONT: the hash-bucketed, id-addressed shared-object registry (original `kcontainer.c`).
//! Each bucket is its own `Mutex<HashMap<..>>`, mirroring the original's single
//! `DEFINE_HASHTABLE` + `DEFINE_MUTEX` pair but spread across `kcont_buckets` locks so
//! concurrent operations on unrelated ids don't serialize behind one global lock.

mod object;

pub use object::KcontObject;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared::IpcError;

use crate::region::Region;

pub struct KcontRegistry {
    buckets: Vec<Mutex<HashMap<u64, Arc<KcontObject>>>>,
}

fn bucket_for(id: u64, bucket_count: usize) -> usize {
    debug_assert!(bucket_count.is_power_of_two());
    let h = id.wrapping_mul(0x9E3779B97F4A7C15);
    (h as usize) & (bucket_count - 1)
}

impl KcontRegistry {
    pub fn new(bucket_count: usize) -> Self {
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, || Mutex::new(HashMap::new()));
        Self { buckets }
    }

    fn bucket(&self, id: u64) -> &Mutex<HashMap<u64, Arc<KcontObject>>> {
        &self.buckets[bucket_for(id, self.buckets.len())]
    }

    /// `KC_IOCTL_CREATE`. `size == 0` is rejected before touching the table, matching the
    /// original's `kcont_create` early `-EINVAL`.
    pub fn create(&self, id: u64, size: u64) -> Result<(), IpcError> {
        if size == 0 {
            return Err(IpcError::InvalidArgument);
        }
        let mut bucket = self.bucket(id).lock().unwrap();
        if bucket.contains_key(&id) {
            return Err(IpcError::AlreadyExists);
        }
        let region = Region::create(&format!("kcont-{id}"), size).map_err(|_| IpcError::OutOfMemory)?;
        bucket.insert(id, Arc::new(KcontObject::new(id, region)));
        Ok(())
    }

    /// `KC_IOCTL_GET_FD`. On success the caller owns one outstanding reference and must
    /// eventually balance it with [`release`](Self::release) — or, if the descriptor never
    /// actually made it onto the wire, with [`rollback_get_fd`](Self::rollback_get_fd).
    pub fn get_fd(&self, id: u64) -> Result<Arc<KcontObject>, IpcError> {
        let bucket = self.bucket(id).lock().unwrap();
        let obj = bucket.get(&id).ok_or(IpcError::NotFound)?.clone();
        obj.get_user();
        Ok(obj)
    }

    /// Undoes a `get_fd` whose descriptor never reached the client (e.g. the reply frame
    /// failed to send), mirroring the original's `fd < 0` rollback path.
    pub fn rollback_get_fd(&self, obj: &KcontObject) {
        obj.put_user();
    }

    /// `RELEASE_FD`, issued by a well-behaved client once it closes its local copy of a
    /// `GET_FD`-issued descriptor. No original ioctl analogue; see the `RELEASE_FD`
    /// REDESIGN FLAG.
    pub fn release(&self, id: u64) -> Result<(), IpcError> {
        let bucket = self.bucket(id).lock().unwrap();
        let obj = bucket.get(&id).ok_or(IpcError::NotFound)?;
        if obj.user_refs() == 0 {
            return Err(IpcError::InvalidArgument);
        }
        obj.put_user();
        Ok(())
    }

    /// `KC_IOCTL_DESTROY`. Refuses while any descriptor is outstanding.
    pub fn destroy(&self, id: u64) -> Result<(), IpcError> {
        let mut bucket = self.bucket(id).lock().unwrap();
        let obj = bucket.get(&id).ok_or(IpcError::NotFound)?;
        if obj.user_refs() > 0 {
            return Err(IpcError::Busy);
        }
        bucket.remove(&id);
        Ok(())
    }

    /// `KC_IOCTL_FORCE_DESTROY`. Unlinks unconditionally; any descriptor already handed to a
    /// client keeps the backing pages alive through its own file reference regardless.
    pub fn force_destroy(&self, id: u64) -> Result<(), IpcError> {
        let mut bucket = self.bucket(id).lock().unwrap();
        if bucket.remove(&id).is_none() {
            return Err(IpcError::NotFound);
        }
        Ok(())
    }

    /// `KC_IOCTL_INFO`. Returns `(size, user_refs, kernel_refs)`.
    pub fn info(&self, id: u64) -> Result<(u64, u64, u64), IpcError> {
        let bucket = self.bucket(id).lock().unwrap();
        let obj = bucket.get(&id).ok_or(IpcError::NotFound)?;
        Ok((obj.region.size(), obj.user_refs(), obj.kernel_refs()))
    }
}
