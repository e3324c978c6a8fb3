pub mod metrics;
pub mod attribution;
pub mod sanitizer;
pub mod report_service;
pub mod refresh;
