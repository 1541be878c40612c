pub mod demand;
pub mod network;
