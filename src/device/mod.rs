pub mod advertisement;
pub mod client;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod pairing;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;
