pub mod fpgrowth;
pub mod kmeans;
pub mod regression;
