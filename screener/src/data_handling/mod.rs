pub mod screening_results;
pub mod library_manifest;
