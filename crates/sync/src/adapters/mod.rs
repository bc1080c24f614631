//! Native-document parsers, one per supported tool.

mod canonizer;
mod indexer;
mod meltano;
pub mod traits;
pub mod utils;

pub use canonizer::CanonizerParser;
pub use indexer::IndexerParser;
pub use meltano::MeltanoParser;
pub use traits::NativeParser;
