pub mod connection_pool;
pub mod migrations;

pub use connection_pool::ConnectionPool;
