pub mod roi;
pub mod public;
