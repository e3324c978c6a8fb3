pub mod period;
pub mod report;
pub mod roi;
