pub mod token;

pub use token::{CellTsPairInfo, CellTsPairToken, next_token};
