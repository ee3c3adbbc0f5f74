//! The wire-visible error taxonomy. Every control reply carries one of these as a single
//! byte; the `Display` text is for daemon-side logs only and never crosses the socket.

use thiserror::Error;

/// Numeric codes as they ride the wire. Stable across revisions: a client pins these, not
/// the enum discriminant order, so new variants must be appended, never inserted.
pub mod code {
    pub const OK: u8 = 0;
    pub const NOT_FOUND: u8 = 1;
    pub const ALREADY_EXISTS: u8 = 2;
    pub const INVALID_ARGUMENT: u8 = 3;
    pub const BUSY: u8 = 4;
    pub const OUT_OF_MEMORY: u8 = 5;
    pub const RESOURCE_EXHAUSTED: u8 = 6;
    pub const FAULT: u8 = 7;
    pub const UNKNOWN_OP: u8 = 8;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcError {
    #[error("key not present in the registry")]
    NotFound,
    #[error("id or name already registered")]
    AlreadyExists,
    #[error("malformed record, zero size, undersized buffer, or wrong session state")]
    InvalidArgument,
    #[error("refused: outstanding references")]
    Busy,
    #[error("allocation failed")]
    OutOfMemory,
    #[error("no descriptor slot available")]
    ResourceExhausted,
    #[error("user-buffer copy failed")]
    Fault,
    #[error("unrecognized control code")]
    UnknownOp,
}

impl IpcError {
    pub const fn code(self) -> u8 {
        match self {
            IpcError::NotFound => code::NOT_FOUND,
            IpcError::AlreadyExists => code::ALREADY_EXISTS,
            IpcError::InvalidArgument => code::INVALID_ARGUMENT,
            IpcError::Busy => code::BUSY,
            IpcError::OutOfMemory => code::OUT_OF_MEMORY,
            IpcError::ResourceExhausted => code::RESOURCE_EXHAUSTED,
            IpcError::Fault => code::FAULT,
            IpcError::UnknownOp => code::UNKNOWN_OP,
        }
    }

    pub const fn from_code(value: u8) -> Option<Self> {
        Some(match value {
            code::NOT_FOUND => IpcError::NotFound,
            code::ALREADY_EXISTS => IpcError::AlreadyExists,
            code::INVALID_ARGUMENT => IpcError::InvalidArgument,
            code::BUSY => IpcError::Busy,
            code::OUT_OF_MEMORY => IpcError::OutOfMemory,
            code::RESOURCE_EXHAUSTED => IpcError::ResourceExhausted,
            code::FAULT => IpcError::Fault,
            code::UNKNOWN_OP => IpcError::UnknownOp,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_for_every_variant() {
        let all = [
            IpcError::NotFound,
            IpcError::AlreadyExists,
            IpcError::InvalidArgument,
            IpcError::Busy,
            IpcError::OutOfMemory,
            IpcError::ResourceExhausted,
            IpcError::Fault,
            IpcError::UnknownOp,
        ];
        for err in all {
            assert_eq!(IpcError::from_code(err.code()), Some(err));
        }
    }

    #[test]
    fn unknown_code_decodes_to_none() {
        assert_eq!(IpcError::from_code(200), None);
    }
}
