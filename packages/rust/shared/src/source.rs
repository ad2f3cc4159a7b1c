//! The fetch capability the tree builder depends on.

use crate::error::Result;
use crate::types::AssignmentLink;

/// Lists the assignments linked from one portal page.
///
/// Implementations decide how pages are fetched and parsed. The returned
/// order is the discovery order and is preserved in the built tree.
#[allow(async_fn_in_trait)]
pub trait AssignmentSource {
    /// Fetch `url` and return its assignment links in page order.
    async fn list_assignments(&self, url: &str) -> Result<Vec<AssignmentLink>>;
}

impl<S: AssignmentSource + ?Sized> AssignmentSource for &S {
    async fn list_assignments(&self, url: &str) -> Result<Vec<AssignmentLink>> {
        (**self).list_assignments(url).await
    }
}
