pub mod inference;
pub mod market_data;
pub mod pipeline;
pub mod stock_viewer;
pub mod vocabulary_builder;

pub use inference::*;
pub use market_data::*;
pub use pipeline::*;
pub use stock_viewer::*;
pub use vocabulary_builder::*;
