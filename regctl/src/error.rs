//! Client-side error type: wraps whatever the transport, the framing layer, or the daemon
//! itself reported, the same three-way split the original `ioctl.rs` made between
//! `CreateFileW` failures, `DeviceIoControl` failures, and the driver's own NTSTATUS.

use shared::framing::FramingError;
use shared::IpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("registry daemon reported: {0}")]
    Daemon(#[from] IpcError),
    #[error("daemon reply did not match the expected shape")]
    MalformedReply,
    #[error("daemon reply carried no file descriptor")]
    MissingDescriptor,
}
