//! Stable identifiers for each entity kind.
//!
//! The upstream CalDAV shape wraps a resource `Url` in a single [`ItemId`] newtype, since a
//! calendar item's id *is* its resource location. Remote ids here are opaque strings assigned by
//! the task service, and each entity kind gets its own newtype so a `TaskId` can't be mixed up
//! with a `ProjectId` at a call site — generalizing the same "don't pass a bare primitive" idea
//! without the URL machinery that doesn't apply to this wire format.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(TaskId);
id_newtype!(ProjectId);
id_newtype!(SectionId);
id_newtype!(LabelId);
id_newtype!(EventId);

/// A plan is identified by a local, DB-assigned integer id (`plans.id` in §6), not a remote id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub i32);

impl Display for PlanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
