pub mod currency;
pub mod date;
pub mod feature_selector;
pub mod logger;
pub mod matrix_utils;

pub use currency::*;
pub use date::*;
pub use feature_selector::*;
pub use logger::*;
pub use matrix_utils::*;
