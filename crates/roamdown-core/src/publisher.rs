//! # Publisher
//!
//! Discovers tagged root blocks and turns each into a rendered post.
//!
//! Candidates are the incoming references of the page named after the
//! publish tag. Only references whose text starts with the publish marker
//! become posts. Lookup and assembly failures are isolated per post unless
//! the caller asks to fail fast.

use crate::assembler::Assembler;
use crate::graph::{Block, Graph};
use crate::markdown::render_document;
use crate::primitives::DEFAULT_PUBLISH_TAG;
use crate::types::RoamError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// PUBLISH MARKER
// =============================================================================

/// Text prefix that marks a block for publishing.
///
/// Both `#tag ` and the bracketed `#[[tag]] ` spelling are recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMarker {
    tag: String,
    plain: String,
    bracketed: String,
}

impl PublishMarker {
    /// Create a marker for the given tag (no leading `#`).
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            plain: format!("#{tag} "),
            bracketed: format!("#[[{tag}]] "),
            tag,
        }
    }

    /// The tag, which is also the title of the publish page.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Text after the marker, or `None` if the text is not marked.
    #[must_use]
    pub fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.strip_prefix(self.plain.as_str())
            .or_else(|| text.strip_prefix(self.bracketed.as_str()))
    }

    /// Check whether the text carries the marker.
    #[must_use]
    pub fn is_marked(&self, text: &str) -> bool {
        self.strip(text).is_some()
    }
}

impl Default for PublishMarker {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISH_TAG)
    }
}

// =============================================================================
// POSTS & REPORT
// =============================================================================

/// A rendered post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Uid of the root block.
    pub uid: String,
    /// Title with the marker removed (before text transform).
    pub title: String,
    /// Full Markdown document.
    pub markdown: String,
}

impl Post {
    /// Output file name: `post_<uid>.md`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("post_{}.md", self.uid)
    }
}

/// A candidate that failed to assemble or render.
#[derive(Debug)]
pub struct SkippedPost {
    pub uid: String,
    pub error: RoamError,
}

/// Outcome of one publishing run.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Posts in candidate order.
    pub posts: Vec<Post>,
    /// Candidates dropped because of a post-local failure.
    pub skipped: Vec<SkippedPost>,
    /// Uids of references without the marker.
    pub unmarked: Vec<String>,
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// Runs discovery, assembly and rendering over a finished graph.
pub struct Publisher<'g> {
    graph: &'g Graph,
    marker: PublishMarker,
}

impl<'g> Publisher<'g> {
    #[must_use]
    pub fn new(graph: &'g Graph, marker: PublishMarker) -> Self {
        Self { graph, marker }
    }

    /// The marker in use.
    #[must_use]
    pub fn marker(&self) -> &PublishMarker {
        &self.marker
    }

    /// Blocks referencing the publish page, in reference order.
    ///
    /// A block referencing the page more than once is listed once; references
    /// from entities that are not blocks are ignored. Fails if the publish
    /// page does not exist.
    pub fn candidates(&self) -> Result<Vec<&'g Block>, RoamError> {
        let page = self.graph.page_block(self.marker.tag())?;
        let mut seen = BTreeSet::new();

        Ok(page
            .incoming_ref_entities()
            .iter()
            .filter_map(|&entity| self.graph.block_of(entity))
            .filter(|block| seen.insert(block.entity()))
            .collect())
    }

    /// Publish one block.
    ///
    /// Returns `Ok(None)` if its text does not carry the marker.
    pub fn publish_block(&self, block: &Block) -> Result<Option<Post>, RoamError> {
        let text = self.graph.text(block)?;
        match self.marker.strip(text) {
            Some(title) => self.render_post(block, title).map(Some),
            None => Ok(None),
        }
    }

    /// Publish every candidate.
    ///
    /// Post-local failures are collected in the report; with `fail_fast`
    /// the first one is returned instead. Other failures always abort.
    pub fn publish_all(&self, fail_fast: bool) -> Result<PublishReport, RoamError> {
        let mut report = PublishReport::default();

        for block in self.candidates()? {
            match self.publish_block(block) {
                Ok(Some(post)) => report.posts.push(post),
                Ok(None) => report.unmarked.push(block.uid().to_string()),
                Err(error) if error.is_post_local() && !fail_fast => {
                    report.skipped.push(SkippedPost {
                        uid: block.uid().to_string(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(report)
    }

    /// Render one block by uid, marked or not.
    pub fn render_uid(&self, uid: &str) -> Result<Post, RoamError> {
        let block = self.graph.block(uid)?;
        let text = self.graph.text(block)?;
        let title = self.marker.strip(text).unwrap_or(text);
        self.render_post(block, title)
    }

    fn render_post(&self, block: &Block, title: &str) -> Result<Post, RoamError> {
        let tree = Assembler::assemble(self.graph, block, title)?;
        Ok(Post {
            uid: block.uid().to_string(),
            title: title.to_string(),
            markdown: render_document(&tree)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r##"#datascript/DB {:schema {}
        :datoms [[1 :node/title "publish" 1]
                 [1 :block/uid "pg" 1]
                 [2 :block/uid "post" 2]
                 [2 :block/string "#publish Hello [[World]]" 2]
                 [2 :block/refs 1 2]
                 [3 :block/uid "kid" 3]
                 [3 :block/string "body" 3]
                 [3 :block/order 0 3]
                 [3 :block/parents 2 3]
                 [4 :block/uid "note" 4]
                 [4 :block/string "mentions [[publish]]" 4]
                 [4 :block/refs 1 4]
                 [5 :block/uid "broken" 5]
                 [5 :block/string "#[[publish]] Broken" 5]
                 [5 :block/refs 1 5]
                 [6 :block/uid "orphan" 6]
                 [6 :block/string "no order" 6]
                 [6 :block/parents 5 6]]}"##;

    fn graph() -> Graph {
        Graph::parse(SNAPSHOT).expect("parse")
    }

    #[test]
    fn marker_recognizes_both_spellings() {
        let marker = PublishMarker::default();
        assert_eq!(marker.strip("#publish Title"), Some("Title"));
        assert_eq!(marker.strip("#[[publish]] Title"), Some("Title"));
        assert_eq!(marker.strip("#publishing Title"), None);
        assert_eq!(marker.strip("Title #publish "), None);
        assert!(!marker.is_marked("#publish"));
    }

    #[test]
    fn post_file_name_uses_uid() {
        let post = Post {
            uid: "abc".to_string(),
            title: String::new(),
            markdown: String::new(),
        };
        assert_eq!(post.file_name(), "post_abc.md");
    }

    #[test]
    fn candidates_follow_reference_order() {
        let graph = graph();
        let publisher = Publisher::new(&graph, PublishMarker::default());
        let uids: Vec<_> = publisher
            .candidates()
            .expect("candidates")
            .iter()
            .map(|b| b.uid())
            .collect();
        assert_eq!(uids, vec!["post", "note", "broken"]);
    }

    #[test]
    fn candidates_skip_repeats_and_non_blocks() {
        let graph = Graph::parse(
            r##"{:datoms [[1 :node/title "publish" 1]
                          [1 :block/uid "pg" 1]
                          [2 :block/uid "twice" 2]
                          [2 :block/string "#publish Twice" 2]
                          [2 :block/refs 1 2]
                          [2 :block/refs 1 2]
                          [9 :block/refs 1 3]
                          [3 :block/uid "once" 4]
                          [3 :block/string "#publish Once" 4]
                          [3 :block/refs 1 4]]}"##,
        )
        .expect("parse");
        let page = graph.page_block("publish").expect("page");
        assert_eq!(page.incoming_ref_entities().len(), 4);

        let publisher = Publisher::new(&graph, PublishMarker::default());
        let uids: Vec<_> = publisher
            .candidates()
            .expect("candidates")
            .iter()
            .map(|b| b.uid())
            .collect();
        assert_eq!(uids, vec!["twice", "once"]);

        let report = publisher.publish_all(true).expect("publish");
        assert_eq!(report.posts.len(), 2);
    }

    #[test]
    fn publish_all_isolates_failures() {
        let graph = graph();
        let publisher = Publisher::new(&graph, PublishMarker::default());
        let report = publisher.publish_all(false).expect("publish");

        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.posts[0].uid, "post");
        assert_eq!(report.posts[0].title, "Hello [[World]]");
        assert_eq!(report.posts[0].markdown, "# Hello _World_\n\n- body\n");
        assert_eq!(report.unmarked, vec!["note".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].uid, "broken");
        assert!(matches!(
            report.skipped[0].error,
            RoamError::MissingAttribute { .. }
        ));
    }

    #[test]
    fn fail_fast_returns_first_failure() {
        let graph = graph();
        let publisher = Publisher::new(&graph, PublishMarker::default());
        assert!(matches!(
            publisher.publish_all(true),
            Err(RoamError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn missing_publish_page_is_fatal() {
        let graph = graph();
        let publisher = Publisher::new(&graph, PublishMarker::new("drafts"));
        assert!(matches!(
            publisher.publish_all(false),
            Err(RoamError::PageNotFound(tag)) if tag == "drafts"
        ));
    }

    #[test]
    fn render_uid_accepts_unmarked_blocks() {
        let graph = graph();
        let publisher = Publisher::new(&graph, PublishMarker::default());
        let post = publisher.render_uid("note").expect("render");
        assert_eq!(post.markdown, "# mentions _publish_\n\n");

        assert!(matches!(
            publisher.render_uid("missing"),
            Err(RoamError::BlockNotFound(_))
        ));
    }
}
