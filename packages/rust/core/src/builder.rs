//! Depth-bounded tree builder.
//!
//! Walks portal pages through an [`AssignmentSource`], one level per
//! recursion, depth-first and strictly sequential. Children are staged in a
//! detached tree and grafted onto the caller's root only when the whole walk
//! succeeds, so a failed build leaves the caller's tree untouched.

use tracing::{info, instrument};

use themis_shared::{AssignmentSource, Result, ThemisError};

use crate::observer::{BuildObserver, TracingObserver};
use crate::tree::{AssignmentTree, NodeId};

/// Builds assignment trees from a fetch capability.
pub struct TreeBuilder<S, O = TracingObserver> {
    source: S,
    observer: O,
}

impl<S: AssignmentSource> TreeBuilder<S> {
    /// Create a builder that reports through `tracing`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            observer: TracingObserver,
        }
    }
}

impl<S: AssignmentSource, O: BuildObserver> TreeBuilder<S, O> {
    /// Replace the observer that receives construction events.
    pub fn with_observer<P: BuildObserver>(self, observer: P) -> TreeBuilder<S, P> {
        TreeBuilder {
            source: self.source,
            observer,
        }
    }

    /// Fetch `url`, attach its assignments below `root`, and recurse `depth` more levels.
    ///
    /// With `depth <= 0` only the listing of `url` itself is attached. A
    /// failed listing of `url` yields [`ThemisError::Fetch`]; a failure further
    /// down yields [`ThemisError::Build`] naming the subtree it happened in.
    /// On error `tree` is left exactly as it was.
    #[instrument(skip_all, fields(url = %url, depth = depth))]
    pub async fn pull_and_build(
        &self,
        tree: &mut AssignmentTree,
        root: NodeId,
        url: &str,
        depth: i32,
    ) -> Result<NodeId> {
        let anchor = tree.node(root)?;
        let mut staging = AssignmentTree::new(anchor.name.clone(), anchor.url.clone());
        let staging_root = staging.root();

        self.expand(&mut staging, staging_root, url, depth).await?;

        let added = staging.len() - 1;
        tree.graft(root, staging)?;
        info!(added, total = tree.len(), "assignment tree built");
        Ok(root)
    }

    async fn expand(
        &self,
        tree: &mut AssignmentTree,
        node: NodeId,
        url: &str,
        depth: i32,
    ) -> Result<()> {
        let links = self
            .source
            .list_assignments(url)
            .await
            .map_err(|e| {
                if matches!(e, ThemisError::Fetch { .. }) {
                    e
                } else {
                    ThemisError::fetch(url, e)
                }
            })?;
        self.observer.page_fetched(url, links.len());

        let parent_name = tree.node(node)?.name.clone();
        let mut added = Vec::with_capacity(links.len());
        for link in links {
            self.observer.node_built(&link.name, &link.url);
            let child = tree.build_node(node, link.name, link.url)?;
            tree.append_child(node, child)?;
            self.observer.child_appended(&parent_name, &tree.node(child)?.name);
            added.push(child);
        }

        if depth <= 0 {
            return Ok(());
        }

        for child in added {
            let (name, child_url) = {
                let n = tree.node(child)?;
                (n.name.clone(), n.url.clone())
            };
            Box::pin(self.expand(tree, child, &child_url, depth - 1))
                .await
                .map_err(|e| ThemisError::build(name, child_url.clone(), e))?;
        }

        Ok(())
    }
}

/// Build below `root` using the default tracing observer.
pub async fn pull_and_build_tree<S: AssignmentSource>(
    source: S,
    tree: &mut AssignmentTree,
    root: NodeId,
    url: &str,
    depth: i32,
) -> Result<NodeId> {
    TreeBuilder::new(source)
        .pull_and_build(tree, root, url, depth)
        .await
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use themis_shared::AssignmentLink;

    use super::*;

    /// In-memory portal: URL -> listing, or an error message.
    #[derive(Default)]
    pub(crate) struct FakePortal {
        pages: HashMap<String, std::result::Result<Vec<AssignmentLink>, String>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakePortal {
        pub(crate) fn page(mut self, url: &str, links: &[(&str, &str)]) -> Self {
            let links = links
                .iter()
                .map(|(name, url)| AssignmentLink::new(*name, *url))
                .collect();
            self.pages.insert(url.to_string(), Ok(links));
            self
        }

        fn failing(mut self, url: &str, message: &str) -> Self {
            self.pages.insert(url.to_string(), Err(message.to_string()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AssignmentSource for FakePortal {
        async fn list_assignments(&self, url: &str) -> Result<Vec<AssignmentLink>> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(links)) => Ok(links.clone()),
                Some(Err(message)) => Err(ThemisError::Network(message.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    /// CS101 -> [HW1, HW2] -> [Submission]
    pub(crate) fn cs101_portal() -> FakePortal {
        FakePortal::default()
            .page("/cs101", &[("HW1", "/cs101/hw1"), ("HW2", "/cs101/hw2")])
            .page("/cs101/hw1", &[("Submission", "/cs101/hw1/sub")])
            .page("/cs101/hw2", &[("Submission", "/cs101/hw2/sub")])
    }

    /// CS101 with one more level: every Submission lists a Feedback page.
    fn deep_cs101_portal() -> FakePortal {
        cs101_portal()
            .page("/cs101/hw1/sub", &[("Feedback", "/cs101/hw1/sub/fb")])
            .page("/cs101/hw2/sub", &[("Feedback", "/cs101/hw2/sub/fb")])
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl BuildObserver for RecordingObserver {
        fn page_fetched(&self, url: &str, links: usize) {
            self.events.lock().unwrap().push(format!("fetched {url} {links}"));
        }

        fn node_built(&self, name: &str, _url: &str) {
            self.events.lock().unwrap().push(format!("built {name}"));
        }

        fn child_appended(&self, parent: &str, child: &str) {
            self.events.lock().unwrap().push(format!("appended {child} to {parent}"));
        }
    }

    fn names(tree: &AssignmentTree) -> Vec<String> {
        tree.iter_preorder().map(|(_, _, n)| n.name.clone()).collect()
    }

    fn nodes_up_to_level(tree: &AssignmentTree, max: usize) -> usize {
        tree.iter_preorder().filter(|(_, level, _)| *level <= max).count()
    }

    #[tokio::test]
    async fn builds_cs101_scenario() {
        let portal = cs101_portal();
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        let built = TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 2)
            .await
            .unwrap();

        assert_eq!(built, root);
        assert_eq!(tree.len(), 5);
        assert_eq!(names(&tree), ["CS101", "HW1", "Submission", "HW2", "Submission"]);
        assert_eq!(
            portal.calls(),
            ["/cs101", "/cs101/hw1", "/cs101/hw1/sub", "/cs101/hw2", "/cs101/hw2/sub"]
        );
    }

    #[tokio::test]
    async fn depth_bounds_height_and_fetch_count() {
        for depth in 0..4 {
            let portal = deep_cs101_portal();
            let mut tree = AssignmentTree::new("CS101", "/cs101");
            let root = tree.root();

            TreeBuilder::new(&portal)
                .pull_and_build(&mut tree, root, "/cs101", depth)
                .await
                .unwrap();

            let depth = depth as usize;
            assert!(tree.height() <= depth + 1, "depth {depth}");
            assert_eq!(portal.calls().len(), nodes_up_to_level(&tree, depth), "depth {depth}");
        }
    }

    #[tokio::test]
    async fn depth_zero_never_fetches_children() {
        let portal = cs101_portal();
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 0)
            .await
            .unwrap();

        assert_eq!(portal.calls(), ["/cs101"]);
        assert_eq!(names(&tree), ["CS101", "HW1", "HW2"]);
        assert!(tree.children(root).iter().all(|&c| tree.children(c).is_empty()));
    }

    #[tokio::test]
    async fn negative_depth_behaves_like_zero() {
        let portal = cs101_portal();
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        pull_and_build_tree(&portal, &mut tree, root, "/cs101", -3)
            .await
            .unwrap();

        assert_eq!(portal.calls(), ["/cs101"]);
        assert_eq!(tree.len(), 3);
    }

    #[tokio::test]
    async fn fetches_depth_first_in_child_order() {
        let portal = deep_cs101_portal();
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 2)
            .await
            .unwrap();

        assert_eq!(
            portal.calls(),
            ["/cs101", "/cs101/hw1", "/cs101/hw1/sub", "/cs101/hw2", "/cs101/hw2/sub"]
        );
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.height(), 3);
    }

    #[tokio::test]
    async fn root_fetch_error_appends_nothing() {
        let portal = FakePortal::default().failing("/cs101", "HTTP 503");
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        let err = TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 2)
            .await
            .unwrap_err();

        match err {
            ThemisError::Fetch { url, message } => {
                assert_eq!(url, "/cs101");
                assert!(message.contains("HTTP 503"));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());
    }

    #[tokio::test]
    async fn nested_failure_names_subtree_and_leaves_tree_untouched() {
        let portal = cs101_portal().failing("/cs101/hw2", "connection reset");
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        let err = TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 2)
            .await
            .unwrap_err();

        match &err {
            ThemisError::Build { name, url, source } => {
                assert_eq!(name, "HW2");
                assert_eq!(url, "/cs101/hw2");
                assert!(matches!(**source, ThemisError::Fetch { .. }));
            }
            other => panic!("expected build error, got {other:?}"),
        }
        assert_eq!(tree.len(), 1);
        // No siblings after the failure are attempted
        assert_eq!(portal.calls().last().map(String::as_str), Some("/cs101/hw2"));
    }

    #[tokio::test]
    async fn deep_failure_wraps_each_level() {
        let portal = deep_cs101_portal().failing("/cs101/hw1/sub", "timeout");
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        let err = TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, root, "/cs101", 3)
            .await
            .unwrap_err();

        let ThemisError::Build { name, source, .. } = err else {
            panic!("expected build error");
        };
        assert_eq!(name, "HW1");
        let ThemisError::Build { name, .. } = *source else {
            panic!("expected nested build error");
        };
        assert_eq!(name, "Submission");
    }

    #[tokio::test]
    async fn builds_below_a_non_root_node() {
        let portal = cs101_portal();
        let mut tree = AssignmentTree::new("Courses", "/courses");
        let root = tree.root();
        let course = tree.build_node(root, "CS101", "/cs101").unwrap();
        tree.append_child(root, course).unwrap();

        TreeBuilder::new(&portal)
            .pull_and_build(&mut tree, course, "/cs101", 0)
            .await
            .unwrap();

        assert_eq!(names(&tree), ["Courses", "CS101", "HW1", "HW2"]);
        let hw1 = tree.children(course)[0];
        assert_eq!(tree.parent(hw1), Some(course));
    }

    #[tokio::test]
    async fn observer_sees_events_in_order() {
        let portal = FakePortal::default().page("/cs101", &[("HW1", "/cs101/hw1")]);
        let observer = RecordingObserver::default();
        let mut tree = AssignmentTree::new("CS101", "/cs101");
        let root = tree.root();

        TreeBuilder::new(&portal)
            .with_observer(&observer)
            .pull_and_build(&mut tree, root, "/cs101", 1)
            .await
            .unwrap();

        let events = observer.events.lock().unwrap().clone();
        assert_eq!(
            events,
            [
                "fetched /cs101 1",
                "built HW1",
                "appended HW1 to CS101",
                "fetched /cs101/hw1 0",
            ]
        );
    }
}
