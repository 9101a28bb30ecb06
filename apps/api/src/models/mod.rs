pub mod assessment;
pub mod report;
