// Driven adapters (output ports: storage)

pub mod persistence;
