//! A single typed variable slot inside a VARS container (original `struct varser_var`).

use std::sync::RwLock;

use shared::{IpcError, TypeTag};

pub struct Variable {
    pub name: String,
    pub type_tag: TypeTag,
    data: RwLock<Vec<u8>>,
}

impl Variable {
    pub fn new(name: String, type_tag: TypeTag, size: u32) -> Self {
        Self { name, type_tag, data: RwLock::new(vec![0u8; size as usize]) }
    }

    pub fn size(&self) -> u32 {
        self.data.read().unwrap().len() as u32
    }

    /// `VARSER_IOCTL_GET`. `buf_size` is the client's declared receive-buffer capacity; the
    /// original rejects the call rather than short-copy when the buffer is too small.
    pub fn get(&self, buf_size: u32) -> Result<Vec<u8>, IpcError> {
        let data = self.data.read().unwrap();
        if (buf_size as usize) < data.len() {
            return Err(IpcError::InvalidArgument);
        }
        Ok(data.clone())
    }

    /// `VARSER_IOCTL_SET`. Copies exactly `self.size()` bytes out of `payload`, matching the
    /// original's `copy_from_user(v->data, user_buf, v->size)`.
    pub fn set(&self, payload: &[u8], buf_size: u32) -> Result<(), IpcError> {
        let mut data = self.data.write().unwrap();
        if (buf_size as usize) < data.len() || payload.len() < data.len() {
            return Err(IpcError::InvalidArgument);
        }
        let len = data.len();
        data.copy_from_slice(&payload[..len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let v = Variable::new("counter".into(), TypeTag::I64, 8);
        v.set(&42i64.to_le_bytes(), 8).unwrap();
        let out = v.get(8).unwrap();
        assert_eq!(i64::from_le_bytes(out.try_into().unwrap()), 42);
    }

    #[test]
    fn get_rejects_an_undersized_caller_buffer() {
        let v = Variable::new("counter".into(), TypeTag::I64, 8);
        assert_eq!(v.get(4), Err(IpcError::InvalidArgument));
    }

    #[test]
    fn set_rejects_a_short_payload() {
        let v = Variable::new("counter".into(), TypeTag::I64, 8);
        assert_eq!(v.set(&[1, 2, 3], 8), Err(IpcError::InvalidArgument));
    }
}
