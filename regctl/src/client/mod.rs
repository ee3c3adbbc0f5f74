pub mod fdrecv;
pub mod kcont;
pub mod vars;

pub use kcont::{KcontClient, KcontHandle};
pub use vars::VarsClient;
