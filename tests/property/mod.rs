//! Property-based tests for marker handling and usage accounting

mod markers;
mod usage;
