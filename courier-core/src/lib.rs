//! Courier Core
//!
//! Core types and abstractions for the Courier job orchestrator.
//!
//! This crate contains:
//! - Domain types: Core business entities (JobRecord, LedgerRef, etc.)
//! - DTOs: Wire shapes for the worker and lifecycle control APIs

pub mod domain;
pub mod dto;
