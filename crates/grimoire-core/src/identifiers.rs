// grimoire-core/src/identifiers.rs
// ============================================================================
// Module: Grimoire Identifiers
// Description: Canonical opaque identifiers for flows, steps, and bindings.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used
//! throughout Grimoire. Identifiers are opaque and serialize as strings.
//! Validation is handled at flow-load or dispatch boundaries rather than
//! within these simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

macro_rules! id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

id_type!(FlowId, "Identifier for a flow document.");
id_type!(StepId, "Identifier for a step within a flow.");
id_type!(InputId, "Identifier for a flow input declaration.");
id_type!(OutputId, "Identifier for a flow output declaration.");
id_type!(VariableId, "Identifier for a flow-local variable declaration.");
id_type!(ChoiceId, "Identifier for a static `player_choice` option.");
id_type!(PromptId, "Identifier for an `llm_generation` prompt template.");
id_type!(CorrelationId, "Identifier correlating a run's logged events.");
