//! Application services: one module per use-case.

pub mod plan;
pub mod prerequisites;
pub mod provisioner;
