//! Cross-module scenarios run against the simulated platform

pub mod e2e;
