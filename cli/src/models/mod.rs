pub mod feature_record;
pub mod pipeline;
pub mod price_history;
pub mod vocabulary;

pub use feature_record::*;
pub use pipeline::*;
pub use price_history::*;
pub use vocabulary::*;
