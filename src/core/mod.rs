//! Helpers shared by every resource adapter.

pub mod locks;
pub mod reconcile;
pub mod retry;
pub mod saga;
pub mod values;

pub use locks::SchemaLocks;
pub use reconcile::SchemaChangeHandling;
pub use retry::RetryPolicy;
pub use saga::Saga;
