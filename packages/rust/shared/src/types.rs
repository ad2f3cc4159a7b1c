//! Core domain types shared between the portal client and the tree builder.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssignmentLink
// ---------------------------------------------------------------------------

/// One `{name, url}` pair listed on a portal page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentLink {
    /// Display label of the linked assignment.
    pub name: String,
    /// Absolute URL of the assignment page.
    pub url: String,
}

impl AssignmentLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for AssignmentLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_display() {
        let link = AssignmentLink::new("HW1", "https://portal.example.com/hw1");
        assert_eq!(link.to_string(), "HW1 <https://portal.example.com/hw1>");
    }

    #[test]
    fn link_deserializes_from_json() {
        let link: AssignmentLink =
            serde_json::from_str(r#"{"name":"Lab 2","url":"https://portal.example.com/lab2"}"#)
                .expect("deserialize");
        assert_eq!(link.name, "Lab 2");
    }
}
