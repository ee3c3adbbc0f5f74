//! Wire protocol shared between `regd` (the registry daemon) and `regctl` (the client
//! library/CLI): control codes, fixed-layout records, and the error taxonomy that rides
//! the control sockets in place of the original ioctl devices.

pub mod constants;
pub mod error;
pub mod framing;
pub mod types;
pub mod wire;

pub use error::IpcError;
pub use types::TypeTag;
