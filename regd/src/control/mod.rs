//! Control-socket dispatch, one module per service, each the direct analogue of one of the
//! original drivers' `ioctl` switch statements.

pub mod kcont;
pub mod vars;
