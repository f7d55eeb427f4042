pub mod hosted;
pub mod page_scrape;

pub use hosted::{HostedParseBackend, HostedParseConfig};
pub use page_scrape::PageScrapeBackend;
