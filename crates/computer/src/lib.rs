pub mod computer;
pub mod error;
pub mod service;

pub use computer::LocalComputer;
pub use error::ComputerError;
pub use service::ComputerService;
