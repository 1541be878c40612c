pub mod coverage;
pub mod dp;
pub mod tabu;
