pub mod base_stock;
pub mod optimization;
