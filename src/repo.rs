pub mod reports_repo;
pub use reports_repo::{ReportsRepository, Resource};
pub mod http_repo;
pub use http_repo::HttpReportsRepository;
pub mod mock_repo;
pub use mock_repo::MockReportsRepository;
