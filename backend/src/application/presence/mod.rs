pub mod registry;

pub use registry::{ConnectionRegistry, DuplicatePolicy, RegistryError};
