pub mod spectrum;
pub mod table;
