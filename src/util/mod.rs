pub mod conversion;
pub mod day;
