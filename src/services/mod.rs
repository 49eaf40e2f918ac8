pub mod callfile;
pub mod converter;
pub mod ownership;
pub mod spool;
