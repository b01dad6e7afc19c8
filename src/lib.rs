//! Compass - A local-first personal task tracker
//!
//! Tasks live in a project directory as JSONL records. The heart of the
//! crate is the dependency graph engine in [`domain`]: cycle validation
//! before writes, deterministic topological ordering, and the ready-work
//! queue derived from it.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    CycleError, DependencyGraph, ProjectKey, Task, TaskId, TaskStatus, TaskType,
};
