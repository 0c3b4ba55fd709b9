pub mod gateway;
pub mod hub;

pub use gateway::ws_handler;
pub use hub::ConnectionHub;
