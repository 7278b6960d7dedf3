//! Typed payloads of the two request/reply protocols.
//!
//! - **Space protocol** (`space`): clients and workers talking to the Space
//! - **Computer protocol** (`computer`): the Space talking to one worker
//! - **Topic constants** (`topics`): canonical topic strings

pub mod computer;
pub mod space;
pub mod topics;

pub use computer::*;
pub use space::*;
