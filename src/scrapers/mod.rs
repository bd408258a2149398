pub mod collector;
pub mod detail;
pub mod funda;
pub mod http;
pub mod traits;
pub mod types;

pub use collector::{CollectStats, ResultSet, ResultSetCollector};
pub use detail::{DetailParser, DetailStatus};
pub use funda::FundaExtractor;
pub use http::HttpFetcher;
pub use traits::{DetailFetcher, DetailPage, PageFetcher};
