//! Workflow step mechanics and the cart workflow handlers.
//!
//! A step receives input data keyed by alias plus its typed collaborators, and
//! produces an output consumed by later steps. Scheduling, retries and
//! compensation belong to the orchestrator, not to steps.

pub mod cart;
pub mod step;

pub use step::{StepData, WorkflowError, WorkflowStep, run_step};
