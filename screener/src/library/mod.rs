pub mod boltz_config;
pub mod cdr_library;
pub mod chimera_prediction;
pub mod chimerax;
pub mod msa;
pub mod optogenetic;
pub mod winners;
pub mod winner_integration;
