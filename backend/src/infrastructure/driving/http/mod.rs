pub mod health;
pub mod presence;

pub use health::health_routes;
pub use presence::presence_routes;
