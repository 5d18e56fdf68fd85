//! Shared utilities for Nexus-Security backend services

pub mod observability;
