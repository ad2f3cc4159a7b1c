//! Depth-bounded tree persistence.
//!
//! A saved tree is a pre-order stream of records, one per line. Each line is
//! indented with four spaces per level below the saved root and holds a
//! compact JSON object:
//!
//! ```text
//! {"Name":"CS101","URL":"https://themis.housing.rug.nl/course/cs101"}
//!     {"Name":"HW1","URL":"https://themis.housing.rug.nl/course/cs101/hw1"}
//!         {"Name":"Submission","URL":"https://themis.housing.rug.nl/course/cs101/hw1/sub"}
//!     {"Name":"HW2","URL":"https://themis.housing.rug.nl/course/cs101/hw2"}
//! ```
//!
//! Parent links are never written; the loader rebuilds them from record
//! order and indentation.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use themis_shared::{DEFAULT_TREE_FILE, Result, ThemisError};

use crate::tree::{AssignmentTree, NodeId};

/// Spaces of indentation per tree level.
const INDENT: usize = 4;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// On-disk form of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord<'a> {
    #[serde(rename = "Name")]
    pub name: Cow<'a, str>,
    #[serde(rename = "URL")]
    pub url: Cow<'a, str>,
}

/// Turns a record into the JSON text of one line.
pub trait RecordEncoder {
    fn encode(&self, record: &NodeRecord<'_>) -> serde_json::Result<String>;
}

/// Compact `serde_json` encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordEncoder;

impl RecordEncoder for JsonRecordEncoder {
    fn encode(&self, record: &NodeRecord<'_>) -> serde_json::Result<String> {
        serde_json::to_string(record)
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Save the subtree at `root` to `assignment_tree.json` in the working directory.
pub fn save_tree_to_file(tree: &AssignmentTree, root: NodeId, depth: i32) -> Result<usize> {
    save_tree(tree, root, depth, DEFAULT_TREE_FILE)
}

/// Save `root` and at most `depth` levels below it to `path`, overwriting it.
///
/// `root` is written at level 0 wherever it sits in `tree`. Returns the
/// number of records written. A negative depth writes an empty file.
pub fn save_tree(
    tree: &AssignmentTree,
    root: NodeId,
    depth: i32,
    path: impl AsRef<Path>,
) -> Result<usize> {
    save_tree_with(tree, root, depth, path, &JsonRecordEncoder)
}

/// [`save_tree`] with a custom record encoder.
///
/// On failure the records written so far are still flushed, so the file holds
/// a valid prefix of the stream. It must not be trusted as a complete snapshot.
#[instrument(skip_all, fields(path = %path.as_ref().display(), root = %root, depth = depth))]
pub fn save_tree_with<E: RecordEncoder + ?Sized>(
    tree: &AssignmentTree,
    root: NodeId,
    depth: i32,
    path: impl AsRef<Path>,
    encoder: &E,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ThemisError::io(path, e))?;
    let mut out = BufWriter::new(file);

    let written = write_tree(&mut out, tree, root, depth, encoder).map_err(|e| match e {
        ThemisError::Stream(source) => ThemisError::io(path, source),
        other => other,
    });
    let closed = out
        .into_inner()
        .map_err(|e| ThemisError::io(path, e.into_error()))
        .and_then(|file| file.sync_all().map_err(|e| ThemisError::io(path, e)));

    match (written, closed) {
        (Ok(records), Ok(())) => {
            info!(records, "assignment tree saved");
            Ok(records)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "failed to close partially written tree");
            }
            Err(e)
        }
    }
}

/// Write the record stream for `root` and at most `depth` levels below it.
///
/// Sink failures surface as [`ThemisError::Stream`]. The writer is flushed
/// once every record is written; on error the caller decides what to keep.
pub fn write_tree<W: Write, E: RecordEncoder + ?Sized>(
    out: &mut W,
    tree: &AssignmentTree,
    root: NodeId,
    depth: i32,
    encoder: &E,
) -> Result<usize> {
    let written = write_subtree(out, tree, root, 0, depth, encoder)?;
    out.flush().map_err(ThemisError::Stream)?;
    Ok(written)
}

fn write_subtree<W: Write, E: RecordEncoder + ?Sized>(
    out: &mut W,
    tree: &AssignmentTree,
    id: NodeId,
    level: usize,
    depth: i32,
    encoder: &E,
) -> Result<usize> {
    if depth < 0 {
        return Ok(0);
    }

    let node = tree.node(id)?;
    let record = NodeRecord {
        name: Cow::Borrowed(node.name.as_str()),
        url: Cow::Borrowed(node.url.as_str()),
    };
    let line = encoder.encode(&record).map_err(|source| ThemisError::Encode {
        name: node.name.clone(),
        source,
    })?;

    writeln!(out, "{:indent$}{line}", "", indent = level * INDENT).map_err(ThemisError::Stream)?;

    let mut written = 1;
    for &child in node.children() {
        written += write_subtree(out, tree, child, level + 1, depth - 1, encoder)?;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Rebuild a tree saved by [`save_tree`].
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_tree_from_file(path: impl AsRef<Path>) -> Result<AssignmentTree> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ThemisError::io(path, e))?;
    let tree = read_tree(BufReader::new(file), path)?;
    info!(nodes = tree.len(), height = tree.height(), "assignment tree loaded");
    Ok(tree)
}

/// Rebuild a tree from a record stream; `path` is only used in error messages.
pub fn read_tree<R: BufRead>(reader: R, path: &Path) -> Result<AssignmentTree> {
    let mut tree: Option<AssignmentTree> = None;
    // ancestors[d] is the most recent node at level d
    let mut ancestors: Vec<NodeId> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| ThemisError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let (level, record) = parse_line(&line, line_no)?;

        let Some(tree) = tree.as_mut() else {
            if level != 0 {
                return Err(ThemisError::decode(
                    line_no,
                    format!("first record must be at level 0, found level {level}"),
                ));
            }
            let root = AssignmentTree::new(record.name, record.url);
            ancestors.push(root.root());
            tree = Some(root);
            continue;
        };

        if level == 0 {
            return Err(ThemisError::decode(line_no, "second root record"));
        }
        if level > ancestors.len() {
            return Err(ThemisError::decode(
                line_no,
                format!(
                    "record at level {level} is nested deeper than its predecessor at level {}",
                    ancestors.len() - 1
                ),
            ));
        }

        ancestors.truncate(level);
        let parent = ancestors[level - 1];
        let child = tree.build_node(parent, record.name, record.url)?;
        tree.append_child(parent, child)?;
        ancestors.push(child);
    }

    let tree = tree.ok_or_else(|| ThemisError::NoRecords {
        path: path.to_path_buf(),
    })?;
    debug!(nodes = tree.len(), "record stream decoded");
    Ok(tree)
}

/// Split a line into its level and owned record.
fn parse_line(line: &str, line_no: usize) -> Result<(usize, NodeRecord<'static>)> {
    let body = line.trim_start_matches(' ');
    let indent = line.len() - body.len();
    if indent % INDENT != 0 {
        return Err(ThemisError::decode(
            line_no,
            format!("indentation of {indent} spaces is not a multiple of {INDENT}"),
        ));
    }

    let record: NodeRecord<'_> = serde_json::from_str(body)
        .map_err(|e| ThemisError::decode(line_no, format!("invalid record: {e}")))?;

    Ok((
        indent / INDENT,
        NodeRecord {
            name: Cow::Owned(record.name.into_owned()),
            url: Cow::Owned(record.url.into_owned()),
        },
    ))
}
