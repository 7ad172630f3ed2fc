pub mod connection;
pub mod store;
pub mod write_queue;

pub use connection::Database;
pub use store::UsageStore;
pub use write_queue::{StoreWrite, WriteQueue};
