// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod key_value_store;
pub mod connection_notifier;

pub use key_value_store::{KeyValueStore, StoreError, StoreOp};
pub use connection_notifier::ConnectionNotifier;
