//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into roster, ledger, attendance and
//!   reporting use cases.
//! - Keep command handlers decoupled from storage details.

pub mod attendance_service;
pub mod ledger_service;
pub mod report_service;
pub mod roster_service;
