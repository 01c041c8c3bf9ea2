pub mod report;
pub mod simulation_config;
