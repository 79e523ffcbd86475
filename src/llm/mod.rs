pub mod gemini;
pub mod orchestrator;
pub mod request;
