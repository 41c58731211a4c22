pub mod app;
pub use app::PortManager;

pub mod config;
pub mod model;
pub mod utils;

// Core engine
pub mod aggregate;
pub mod catalog;
pub mod refresh;
pub mod registry;
pub mod scanner;
pub mod terminator;

// Platform abstraction layer
pub mod platform;

pub use aggregate::{aggregate, filter};
pub use catalog::PortCatalog;
pub use model::{
    ActiveSocketFact, CoreEvent, KillOutcome, PortEntry, PortSnapshot, PortViewRecord,
    RefreshStatus, Transport,
};
pub use refresh::RefreshCoordinator;
pub use registry::{PortRegistry, RegistryError};
pub use scanner::{ScanError, SocketFacts, SocketScanner, SocketTable};
pub use terminator::{ProcessControl, ProcessTerminator};
