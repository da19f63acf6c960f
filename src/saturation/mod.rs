pub mod simplifier;
pub mod subsumption_index;

// Re-export the main public types
pub use simplifier::{ForwardSimplifier, Simplification};
pub use subsumption_index::{ClauseSubsumptionIndex, LinearSubsumptionIndex};
