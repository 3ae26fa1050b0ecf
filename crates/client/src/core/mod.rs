pub mod orchestrator;
pub mod startup_check;
pub mod state_reader;
pub mod validation;
