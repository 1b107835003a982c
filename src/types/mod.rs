pub mod reading_data;
pub mod term_data;

pub use reading_data::*;
pub use term_data::*;
