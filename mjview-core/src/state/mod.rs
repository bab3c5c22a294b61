pub mod connection;

pub use connection::ConnectionStatus;
