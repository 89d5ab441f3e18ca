//! Core domain models

pub mod report;
