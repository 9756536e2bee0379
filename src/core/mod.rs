pub mod dispatcher;
pub mod error;
pub mod events;
pub mod executor;
pub mod handlers;
pub mod locks;
pub mod model;
pub mod router;
pub mod services;
pub mod traits;
