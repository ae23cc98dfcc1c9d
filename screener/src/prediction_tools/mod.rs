pub mod boltz_integration;
