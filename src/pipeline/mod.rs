pub mod enrich;
pub mod orchestrator;
pub mod resolve;
pub mod scoring;
