pub mod job;
pub mod trunk;
