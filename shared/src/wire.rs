//! Fixed-layout request/response records for both services.
//!
//! Every record here has an explicit, hand-rolled `to_bytes`/`from_bytes` pair instead of a
//! generic serializer: the original ioctl structs are byte-exact C layouts, and the two
//! processes on either end of a control socket must agree on field order and padding without
//! relying on a shared derive macro picking the same representation on both sides. Reserved
//! bytes are asserted zero on decode (a non-zero reserved byte is `WireError::ReservedNonZero`,
//! which the dispatch layer folds into `IpcError::InvalidArgument`) and written as zero on encode.

use crate::constants::{CONTAINER_NAME_LEN, MAX_VARS, VAR_NAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    TooShort,
    ReservedNonZero,
    NameNotNulTerminated,
    StringTooLong,
}

fn write_fixed_str(dst: &mut [u8], s: &str) -> Result<(), WireError> {
    let bytes = s.as_bytes();
    if bytes.len() >= dst.len() {
        return Err(WireError::StringTooLong);
    }
    dst[..bytes.len()].copy_from_slice(bytes);
    dst[bytes.len()..].fill(0);
    Ok(())
}

fn read_fixed_str(src: &[u8]) -> Result<String, WireError> {
    let end = src.iter().position(|&b| b == 0).ok_or(WireError::NameNotNulTerminated)?;
    Ok(String::from_utf8_lossy(&src[..end]).into_owned())
}

/// `KC_IOCTL_CREATE` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateReq {
    pub id: u64,
    pub size: u64,
    pub flags: u64,
}

impl CreateReq {
    pub const WIRE_SIZE: usize = 24;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..8].copy_from_slice(&self.id.to_le_bytes());
        out[8..16].copy_from_slice(&self.size.to_le_bytes());
        out[16..24].copy_from_slice(&self.flags.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        Ok(Self {
            id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            size: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            flags: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
        })
    }
}

/// Body shared by `DESTROY`, `INFO`, `GET_FD`, `FORCE_DESTROY`, and `RELEASE_FD` requests,
/// all of which name a single object by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdReq {
    pub id: u64,
}

impl IdReq {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        self.id.to_le_bytes()
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        Ok(Self { id: u64::from_le_bytes(buf[0..8].try_into().unwrap()) })
    }
}

/// `KC_IOCTL_INFO` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoRec {
    pub id: u64,
    pub size: u64,
    pub user_refs: u64,
    pub kernel_refs: u64,
}

impl InfoRec {
    pub const WIRE_SIZE: usize = 32;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..8].copy_from_slice(&self.id.to_le_bytes());
        out[8..16].copy_from_slice(&self.size.to_le_bytes());
        out[16..24].copy_from_slice(&self.user_refs.to_le_bytes());
        out[24..32].copy_from_slice(&self.kernel_refs.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        Ok(Self {
            id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            size: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            user_refs: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            kernel_refs: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
        })
    }
}

/// One entry of a `REGISTER` request (original `varser_var_desc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDesc {
    pub name: String,
    pub type_tag: u8,
    pub capacity: u32,
}

impl VarDesc {
    pub const WIRE_SIZE: usize = VAR_NAME_LEN + 1 + 4 + 3;

    pub fn to_bytes(&self, out: &mut [u8]) -> Result<(), WireError> {
        if out.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        write_fixed_str(&mut out[0..VAR_NAME_LEN], &self.name)?;
        out[VAR_NAME_LEN] = self.type_tag;
        out[VAR_NAME_LEN + 1..VAR_NAME_LEN + 5].copy_from_slice(&self.capacity.to_le_bytes());
        out[VAR_NAME_LEN + 5..Self::WIRE_SIZE].fill(0);
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        let name = read_fixed_str(&buf[0..VAR_NAME_LEN])?;
        let type_tag = buf[VAR_NAME_LEN];
        let capacity = u32::from_le_bytes(buf[VAR_NAME_LEN + 1..VAR_NAME_LEN + 5].try_into().unwrap());
        if buf[VAR_NAME_LEN + 5..Self::WIRE_SIZE].iter().any(|&b| b != 0) {
            return Err(WireError::ReservedNonZero);
        }
        Ok(Self { name, type_tag, capacity })
    }
}

/// `VARSER_IOCTL_REGISTER` body. `vars` always carries exactly `MAX_VARS` fixed-layout
/// entries on the wire; only the first `var_count` are meaningful, mirroring the original
/// `struct varser_register`'s oversized fixed array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterReq {
    pub container_name: String,
    pub vars: Vec<VarDesc>,
}

impl RegisterReq {
    pub const WIRE_SIZE: usize = CONTAINER_NAME_LEN + 4 + 4 + MAX_VARS * VarDesc::WIRE_SIZE;

    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        if self.vars.len() > MAX_VARS {
            return Err(WireError::StringTooLong);
        }
        let mut out = vec![0u8; Self::WIRE_SIZE];
        write_fixed_str(&mut out[0..CONTAINER_NAME_LEN], &self.container_name)?;
        let base = CONTAINER_NAME_LEN;
        out[base..base + 4].copy_from_slice(&(self.vars.len() as u32).to_le_bytes());
        // out[base+4..base+8] is the reserved gap; already zeroed.
        let vars_base = base + 8;
        for (i, v) in self.vars.iter().enumerate() {
            let start = vars_base + i * VarDesc::WIRE_SIZE;
            v.to_bytes(&mut out[start..start + VarDesc::WIRE_SIZE])?;
        }
        Ok(out)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        let container_name = read_fixed_str(&buf[0..CONTAINER_NAME_LEN])?;
        let base = CONTAINER_NAME_LEN;
        let var_count = u32::from_le_bytes(buf[base..base + 4].try_into().unwrap()) as usize;
        if buf[base + 4..base + 8].iter().any(|&b| b != 0) {
            return Err(WireError::ReservedNonZero);
        }
        if var_count > MAX_VARS {
            return Err(WireError::StringTooLong);
        }
        let vars_base = base + 8;
        let mut vars = Vec::with_capacity(var_count);
        for i in 0..var_count {
            let start = vars_base + i * VarDesc::WIRE_SIZE;
            vars.push(VarDesc::from_bytes(&buf[start..start + VarDesc::WIRE_SIZE])?);
        }
        Ok(Self { container_name, vars })
    }
}

/// Header shared by `SET`/`GET` requests (original `varser_var_access`, minus
/// `container_name` — the bound session already determines the container, the field was
/// vestigial in the original dispatch — and minus `user_buf`, a raw pointer meaningless
/// across a socket; see the ioctl→socket REDESIGN FLAG). The payload bytes for `SET`, or the
/// reply bytes for `GET`, ride immediately after this header in the same frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarAccessHeader {
    pub var_name: String,
    pub buf_size: u32,
}

impl VarAccessHeader {
    pub const WIRE_SIZE: usize = VAR_NAME_LEN + 4;

    pub fn to_bytes(&self) -> Result<[u8; Self::WIRE_SIZE], WireError> {
        let mut out = [0u8; Self::WIRE_SIZE];
        write_fixed_str(&mut out[0..VAR_NAME_LEN], &self.var_name)?;
        out[VAR_NAME_LEN..Self::WIRE_SIZE].copy_from_slice(&self.buf_size.to_le_bytes());
        Ok(out)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::TooShort);
        }
        let var_name = read_fixed_str(&buf[0..VAR_NAME_LEN])?;
        let buf_size = u32::from_le_bytes(buf[VAR_NAME_LEN..Self::WIRE_SIZE].try_into().unwrap());
        Ok(Self { var_name, buf_size })
    }
}

/// Fixed-width container-name frame used by `OPEN_CONTAINER`.
pub fn container_name_to_bytes(name: &str) -> Result<[u8; CONTAINER_NAME_LEN], WireError> {
    let mut out = [0u8; CONTAINER_NAME_LEN];
    write_fixed_str(&mut out, name)?;
    Ok(out)
}

pub fn container_name_from_bytes(buf: &[u8]) -> Result<String, WireError> {
    if buf.len() < CONTAINER_NAME_LEN {
        return Err(WireError::TooShort);
    }
    read_fixed_str(&buf[0..CONTAINER_NAME_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_req_round_trips() {
        let req = IdReq { id: 42 };
        assert_eq!(IdReq::from_bytes(&req.to_bytes()).unwrap(), req);
    }

    #[test]
    fn create_req_round_trips() {
        let req = CreateReq { id: 9999, size: 4, flags: 0 };
        let bytes = req.to_bytes();
        assert_eq!(CreateReq::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn info_rec_round_trips() {
        let rec = InfoRec { id: 1, size: 4096, user_refs: 1, kernel_refs: 2 };
        assert_eq!(InfoRec::from_bytes(&rec.to_bytes()).unwrap(), rec);
    }

    #[test]
    fn var_desc_round_trips_and_validates_reserved_bytes() {
        let desc = VarDesc { name: "counter".into(), type_tag: 2, capacity: 8 };
        let mut buf = [0u8; VarDesc::WIRE_SIZE];
        desc.to_bytes(&mut buf).unwrap();
        assert_eq!(VarDesc::from_bytes(&buf).unwrap(), desc);

        buf[VarDesc::WIRE_SIZE - 1] = 1;
        assert_eq!(VarDesc::from_bytes(&buf), Err(WireError::ReservedNonZero));
    }

    #[test]
    fn register_req_round_trips_with_multiple_vars() {
        let req = RegisterReq {
            container_name: "c".into(),
            vars: vec![
                VarDesc { name: "counter".into(), type_tag: 2, capacity: 8 },
                VarDesc { name: "label".into(), type_tag: 7, capacity: 32 },
            ],
        };
        let bytes = req.to_bytes().unwrap();
        assert_eq!(bytes.len(), RegisterReq::WIRE_SIZE);
        assert_eq!(RegisterReq::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn var_access_header_round_trips() {
        let hdr = VarAccessHeader { var_name: "counter".into(), buf_size: 8 };
        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(VarAccessHeader::from_bytes(&bytes).unwrap(), hdr);
    }

    #[test]
    fn container_name_round_trips() {
        let bytes = container_name_to_bytes("c").unwrap();
        assert_eq!(container_name_from_bytes(&bytes).unwrap(), "c");
    }

    #[test]
    fn name_too_long_is_rejected() {
        let long = "x".repeat(VAR_NAME_LEN);
        let desc = VarDesc { name: long, type_tag: 1, capacity: 0 };
        let mut buf = [0u8; VarDesc::WIRE_SIZE];
        assert_eq!(desc.to_bytes(&mut buf), Err(WireError::StringTooLong));
    }
}
