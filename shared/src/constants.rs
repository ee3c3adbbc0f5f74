//! Bounds, default paths, and control-code numbering for both services.
//!
//! The bounds here (`CONTAINER_NAME_LEN`, `VAR_NAME_LEN`, `MAX_VARS`) are wire contract, not
//! implementation detail: the fixed-layout records in [`crate::wire`] depend on them exactly,
//! per the reimplementation note in the spec's "Bounded identifiers vs open strings" section.

/// Default control-socket path for the KCONT service (stands in for `/dev/kcontainer`).
pub const DEFAULT_KCONT_SOCKET: &str = "/run/kvreg/kcontainer.sock";
/// Default control-socket path for the VARS service (stands in for `/dev/varser`).
pub const DEFAULT_VARS_SOCKET: &str = "/run/kvreg/varser.sock";

/// Number of hash buckets backing the KCONT registry. Power of two, fixed for the table's
/// lifetime once the daemon starts.
pub const DEFAULT_KCONT_BUCKETS: usize = 1024;

/// Default storage size (bytes) for a VARS variable whose descriptor omits `capacity`.
/// Per the spec's design notes: "treat this as an interface contract, not an accident."
pub const DEFAULT_VAR_CAPACITY: u32 = 8;

/// Maximum length of a VARS container name, including the NUL terminator slot.
pub const CONTAINER_NAME_LEN: usize = 256;
/// Maximum length of a VARS variable name, including the NUL terminator slot.
pub const VAR_NAME_LEN: usize = 64;
/// Maximum number of variables a single REGISTER call may describe.
pub const MAX_VARS: usize = 128;
/// Size of the buffer LIST_CONTAINERS copies into; truncation behavior is a resolved design
/// decision, see DESIGN.md.
pub const LIST_CONTAINERS_BUF: usize = 4096;

/// KCONT control codes (original ioctl magic `'K'`). `RELEASE_FD` has no ioctl analogue; see
/// the `RELEASE_FD` REDESIGN FLAG for why a userspace daemon needs it.
pub mod kcont_op {
    pub const GET_FD: u8 = 1;
    pub const CREATE: u8 = 2;
    pub const DESTROY: u8 = 3;
    pub const INFO: u8 = 4;
    pub const FORCE_DESTROY: u8 = 5;
    pub const RELEASE_FD: u8 = 6;
}

/// VARS control codes (original ioctl magic `'V'`).
pub mod vars_op {
    pub const REGISTER: u8 = 1;
    pub const SET: u8 = 2;
    pub const GET: u8 = 3;
    pub const OPEN_CONTAINER: u8 = 4;
    pub const CLOSE_CONTAINER: u8 = 5;
    pub const LIST_CONTAINERS: u8 = 6;
}
