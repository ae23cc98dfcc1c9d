pub mod specificity;
pub mod ranking;
pub mod report;
pub mod specificity_analysis_integration;
