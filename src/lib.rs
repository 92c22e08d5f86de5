pub mod model;
pub mod observability;
pub mod scheduler;
pub mod store;
pub mod wire;
