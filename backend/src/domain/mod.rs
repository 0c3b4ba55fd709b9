// Domain layer - identifiers, key layout and the records kept in the store
// No dependencies on other layers

pub mod entities;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
