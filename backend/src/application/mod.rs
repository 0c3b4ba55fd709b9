// Application layer - presence directory and challenge relay
// Depends on the domain layer and on ports implemented by infrastructure

pub mod challenge;
pub mod locks;
pub mod ports;
pub mod presence;
