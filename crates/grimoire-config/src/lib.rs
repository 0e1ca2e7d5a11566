// grimoire-config/src/lib.rs
// ============================================================================
// Module: Grimoire Config Library
// Description: Public API surface for the YAML flow loader.
// Purpose: Turn raw flow documents into validated `grimoire_core::Flow`
//          values before they ever reach the interpreter.
// Dependencies: crate::loader
// ============================================================================

//! ## Overview
//! `grimoire-config` is the one place flow authoring meets the filesystem.
//! It never interprets a flow; it only parses YAML into the shape
//! `grimoire-core` defines and runs [`grimoire_core::Flow::validate`]
//! before handing a flow back to a caller, mirroring how the teacher's
//! `decision-gate-config` turns raw documents into a validated
//! `ScenarioSpec` ahead of the control plane.

pub mod loader;

pub use loader::LoadError;
pub use loader::LoadedFlow;
pub use loader::load_flow_bytes;
pub use loader::load_flow_file;
pub use loader::load_flow_str;
pub use loader::load_registry_dir;
