//! The estimation engine.
//!
//! This module provides:
//! - **errors**: Error type shared by every stage
//! - **data**: Categorical observation matrix
//! - **graph**: Skeleton and CPDAG structures
//! - **sepset**: Separation-set table
//! - **contingency**: Contingency cubes and the G² statistic
//! - **ci_test**: Conditional-independence tests
//! - **oracle**: Thresholded independence decisions
//! - **diagnostics**: Event sinks for search and orientation
//! - **skeleton**: PC and stable-PC skeleton search
//! - **cpdag**: Collider orientation and Meek rules

pub mod contingency;
pub mod cpdag;
pub mod data;
pub mod diagnostics;
pub mod errors;
pub mod graph;
pub mod oracle;
pub mod sepset;
pub mod skeleton;
