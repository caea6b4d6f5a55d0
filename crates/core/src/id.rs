//! Strongly typed identifiers used across the workflow engine.
//!
//! `ExecutionId` and `WorkflowId` wrap a random UUID assigned by the engine
//! or the workflow author. `NodeId` wraps the author-chosen string id used
//! inside a single workflow definition (nodes are referenced by human
//! picked ids in edges and config, not UUIDs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the nil (all-zero) identifier, used in tests and defaults.
            #[must_use]
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Access the underlying UUID.
            #[must_use]
            pub fn get(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::v4()
            }
        }
    };
}

define_uuid_id!(ExecutionId);
define_uuid_id!(WorkflowId);

/// A workflow-author-chosen node identifier, unique within one
/// [`WorkflowDefinition`](https://docs.rs/loomwork-workflow).
///
/// Unlike [`ExecutionId`]/[`WorkflowId`] this is not a UUID: workflow
/// authors write node ids by hand (`"llm-1"`, `"quality-check"`) and
/// reference them from edges and templates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Construct a node id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
