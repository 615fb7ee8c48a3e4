//! Core of the code-execution broker: session lifecycle, container driver
//! abstraction, artifact diffing, and the error taxonomy. The HTTP artifact
//! surface and the daemon binary are separate crates that depend on this one.

pub mod config;
pub mod driver;
pub mod error;
pub mod ids;
pub mod manager;
pub mod mime;
pub mod models;
pub mod reaper;
pub mod registry;
pub mod scanner;
pub mod tarcodec;
pub mod validation;

pub use config::SandboxConfig;
pub use driver::ContainerDriver;
pub use error::{DriverError, SandboxError};
pub use manager::SessionManager;
pub use models::{ArtifactInfo, CloseResult, ListResult, ReadResult, RunResult, UploadResult};
