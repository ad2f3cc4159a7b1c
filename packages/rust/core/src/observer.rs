//! Build observers: the builder reports construction events here instead of
//! logging directly.

use tracing::debug;

/// Receives tree-construction events from [`TreeBuilder`](crate::TreeBuilder).
pub trait BuildObserver: Send + Sync {
    /// Called after a page listing returned `links` entries.
    fn page_fetched(&self, url: &str, links: usize);
    /// Called when a node has been built, before it is attached.
    fn node_built(&self, name: &str, url: &str);
    /// Called after `child` was appended to `parent`.
    fn child_appended(&self, parent: &str, child: &str);
}

impl<T: BuildObserver + ?Sized> BuildObserver for &T {
    fn page_fetched(&self, url: &str, links: usize) {
        (**self).page_fetched(url, links);
    }

    fn node_built(&self, name: &str, url: &str) {
        (**self).node_built(name, url);
    }

    fn child_appended(&self, parent: &str, child: &str) {
        (**self).child_appended(parent, child);
    }
}

/// Default observer: emits `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn page_fetched(&self, url: &str, links: usize) {
        debug!(url, links, "fetched assignment listing");
    }

    fn node_built(&self, name: &str, url: &str) {
        debug!(name, url, "building node");
    }

    fn child_appended(&self, parent: &str, child: &str) {
        debug!(parent, child, "appending child");
    }
}

/// No-op observer for headless/test usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl BuildObserver for SilentObserver {
    fn page_fetched(&self, _url: &str, _links: usize) {}
    fn node_built(&self, _name: &str, _url: &str) {}
    fn child_appended(&self, _parent: &str, _child: &str) {}
}
