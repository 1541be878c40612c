pub mod network;
pub mod single;
