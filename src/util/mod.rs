//! Shared formatting utilities for the text report.

pub mod hex;
