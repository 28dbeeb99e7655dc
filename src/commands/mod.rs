pub mod process;
pub mod reports;
pub mod status;
