//! Agent-callable tools wrapping the aggregator and the news retriever

pub mod fundamentals;
pub mod news;

pub use fundamentals::FundamentalsTool;
pub use news::NewsSearchTool;
