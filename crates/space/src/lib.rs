pub mod executor;
pub mod proxy;
pub mod queue;
pub mod service;
pub mod space;

pub use executor::SuccessorExecutor;
pub use proxy::ComputerProxy;
pub use queue::ReadyQueue;
pub use service::SpaceService;
pub use space::Space;
