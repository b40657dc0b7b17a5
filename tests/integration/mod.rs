//! Integration test suite for the conclave coordination substrate.
//!
//! These tests exercise the substrate end to end: planning a task set,
//! routing work against roster snapshots, running actor workflows over the
//! message bus, and driving the feedback/revision cycle. They verify that
//! the components work together, not just in isolation.
//!
//! # Test Categories
//!
//! - `planning_e2e`: task decomposition, phases, critical path
//! - `routing_e2e`: routing precedence and fallback behavior
//! - `feedback_e2e`: feedback classification and the revision cycle
//! - `workflow_e2e`: actor runs, hand-offs, error and cancellation paths
//!
//! # CI Compatibility
//!
//! The reasoning oracle is scripted and the persistence store is
//! in-memory, so the suite runs without external collaborators.

mod fixtures;

mod feedback_e2e;
mod planning_e2e;
mod routing_e2e;
mod workflow_e2e;
