//! FST - the file system table embedded in `.arc` archives.
//!
//! The same node layout GameCube discs use for their root file system: a
//! flat, depth-first list of nodes followed by a table of names.
//!
//! ## Layout (big-endian)
//! ```text
//! [0x00] Node table    (NodeCount × 0x0C bytes, node 0 is the root)
//! [....] Name table    (null-terminated names, root name first)
//! ```
//!
//! ## Node (0x0C bytes)
//! ```text
//! [0x00] Type        (u8)   0 = file, 1 = directory
//! [0x01] NameOffset  (u24)  byte offset into the name table
//! [0x04] file: DataOffset (u32, from archive start)   dir: Parent index
//! [0x08] file: DataSize   (u32)                       dir: Next index
//! ```
//!
//! A directory's `Next` is the index one past its last descendant, so the
//! children of node `d` are the nodes `d + 1 .. next`. The root's `Next` is
//! therefore the total node count.

use std::io::{Cursor, Read, Write};

use crate::utils::{be_u32, bytesv, null_string, write_be_u32};
use crate::{Error, Result};

/// Size of one node record in bytes.
pub const NODE_SIZE: usize = 0x0C;

const MAX_NAME_OFFSET: usize = 0x00FF_FFFF;
const TYPE_FILE: u32 = 0;
const TYPE_DIRECTORY: u32 = 1;

/// What a node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A file; `offset` is measured from the start of the archive.
    File { offset: u32, size: u32 },
    /// A directory spanning the nodes `index + 1 .. next`.
    Directory { parent: u32, next: u32 },
}

/// One entry of the node table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Name of this node alone (no directory components).
    pub name: String,
    pub kind: NodeKind,
    name_offset: u32,
}

/// A parsed or freshly built file system table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystem {
    /// Nodes in table order; `nodes[0]` is the root.
    pub nodes: Vec<Node>,
    /// Raw name table, kept as-is so a parsed table writes back unchanged.
    names: Vec<u8>,
}

/// Split an archive path into its components, rejecting anything that
/// cannot name a node.
pub(crate) fn split_path(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return Err(Error::InvalidArgument(format!(
            "'{path}' is not a valid archive path"
        )));
    }
    Ok(parts)
}

/// Directory tree used while building; children keep first-appearance order.
#[derive(Default)]
struct DirTree<'a> {
    children: Vec<(&'a str, Child<'a>)>,
}

enum Child<'a> {
    /// Index into the caller's file list.
    File(usize),
    Dir(DirTree<'a>),
}

impl<'a> DirTree<'a> {
    fn insert(&mut self, parts: &[&'a str], index: usize, path: &str) -> Result<()> {
        let Some((&name, rest)) = parts.split_first() else {
            return Ok(());
        };
        let existing = self.children.iter().position(|(n, _)| *n == name);
        match existing {
            None if rest.is_empty() => self.children.push((name, Child::File(index))),
            None => {
                let mut dir = DirTree::default();
                dir.insert(rest, index, path)?;
                self.children.push((name, Child::Dir(dir)));
            }
            Some(i) => match &mut self.children[i].1 {
                Child::Dir(dir) if !rest.is_empty() => dir.insert(rest, index, path)?,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "'{path}' collides with another archive entry"
                    )));
                }
            },
        }
        Ok(())
    }

    fn flatten(
        &self,
        parent: usize,
        fs: &mut FileSystem,
        order: &mut Vec<(usize, usize)>,
    ) -> Result<()> {
        for (name, child) in &self.children {
            let node = fs.nodes.len();
            match child {
                Child::File(index) => {
                    fs.push_node(name, NodeKind::File { offset: 0, size: 0 })?;
                    order.push((node, *index));
                }
                Child::Dir(dir) => {
                    fs.push_node(
                        name,
                        NodeKind::Directory {
                            parent: parent as u32,
                            next: 0,
                        },
                    )?;
                    dir.flatten(node, fs, order)?;
                    let end = fs.nodes.len() as u32;
                    if let NodeKind::Directory { next, .. } = &mut fs.nodes[node].kind {
                        *next = end;
                    }
                }
            }
        }
        Ok(())
    }
}

impl FileSystem {
    /// Build a table for the given file paths (`/`-separated, relative).
    ///
    /// Directories are created as needed. File nodes start with a zero
    /// offset and size; fill them in with [`FileSystem::set_file_location`].
    ///
    /// Also returns `(node index, path index)` for every file, in table
    /// order, which is the order their data should be laid out in.
    pub fn build<'a, I>(paths: I) -> Result<(Self, Vec<(usize, usize)>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tree = DirTree::default();
        for (index, path) in paths.into_iter().enumerate() {
            tree.insert(&split_path(path)?, index, path)?;
        }

        let mut fs = Self {
            nodes: Vec::new(),
            names: Vec::new(),
        };
        fs.push_node("", NodeKind::Directory { parent: 0, next: 0 })?;
        let mut order = Vec::new();
        tree.flatten(0, &mut fs, &mut order)?;
        let count = fs.nodes.len() as u32;
        fs.nodes[0].kind = NodeKind::Directory {
            parent: 0,
            next: count,
        };
        Ok((fs, order))
    }

    fn push_node(&mut self, name: &str, kind: NodeKind) -> Result<()> {
        let name_offset = self.names.len();
        if name_offset > MAX_NAME_OFFSET {
            return Err(Error::InvalidArgument("file system name table too large".into()));
        }
        self.names.extend_from_slice(name.as_bytes());
        self.names.push(0);
        self.nodes.push(Node {
            name: name.to_owned(),
            kind,
            name_offset: name_offset as u32,
        });
        Ok(())
    }

    /// Serialized size in bytes (node table plus name table).
    pub fn byte_len(&self) -> usize {
        self.nodes.len() * NODE_SIZE + self.names.len()
    }

    /// Parse a table occupying exactly `size` bytes at the reader's position.
    pub fn parse<R: Read>(r: &mut R, size: u32) -> Result<Self> {
        let raw = bytesv(r, size as usize)?;
        let mut c = Cursor::new(&raw[..]);

        let root_word = be_u32(&mut c)?;
        let _root_parent = be_u32(&mut c)?;
        let count = be_u32(&mut c)? as usize;
        if root_word >> 24 != TYPE_DIRECTORY {
            return Err(Error::Parse("FST root node is not a directory"));
        }
        if count == 0 {
            return Err(Error::Parse("FST has no root node"));
        }
        let table_len = count
            .checked_mul(NODE_SIZE)
            .filter(|&n| n <= raw.len())
            .ok_or(Error::Parse("FST node table exceeds its declared size"))?;

        let names = raw[table_len..].to_vec();
        c.set_position(0);

        let mut nodes: Vec<Node> = Vec::with_capacity(count);
        for i in 0..count {
            let word = be_u32(&mut c)?;
            let a = be_u32(&mut c)?;
            let b = be_u32(&mut c)?;
            let name_offset = word & 0x00FF_FFFF;
            let name = null_string(&names, name_offset as usize)?;

            let kind = match word >> 24 {
                TYPE_FILE => NodeKind::File { offset: a, size: b },
                TYPE_DIRECTORY => {
                    check_directory(&nodes, i, a as usize, b as usize, count)?;
                    NodeKind::Directory { parent: a, next: b }
                }
                _ => return Err(Error::Parse("unknown FST node type")),
            };
            nodes.push(Node {
                name,
                kind,
                name_offset,
            });
        }

        Ok(Self { nodes, names })
    }

    /// Write the node table followed by the name table.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        for node in &self.nodes {
            let (ty, a, b) = match node.kind {
                NodeKind::File { offset, size } => (TYPE_FILE, offset, size),
                NodeKind::Directory { parent, next } => (TYPE_DIRECTORY, parent, next),
            };
            write_be_u32(w, (ty << 24) | node.name_offset)?;
            write_be_u32(w, a)?;
            write_be_u32(w, b)?;
        }
        w.write_all(&self.names)?;
        Ok(())
    }

    /// Record where a file node's data ended up.
    pub fn set_file_location(&mut self, node: usize, offset: u32, size: u32) -> Result<()> {
        let Some(n) = self
            .nodes
            .get_mut(node)
            .filter(|n| matches!(n.kind, NodeKind::File { .. }))
        else {
            return Err(Error::InvalidArgument(format!("node {node} is not a file")));
        };
        n.kind = NodeKind::File { offset, size };
        Ok(())
    }

    /// Full `/`-separated paths of every file node, in table order, paired
    /// with the node index.
    pub fn file_paths(&self) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        // (directory name, index one past its last child)
        let mut stack: Vec<(&str, usize)> = Vec::new();

        for (i, node) in self.nodes.iter().enumerate().skip(1) {
            while stack.last().is_some_and(|&(_, end)| i >= end) {
                stack.pop();
            }
            match node.kind {
                NodeKind::Directory { next, .. } => stack.push((node.name.as_str(), next as usize)),
                NodeKind::File { .. } => {
                    let mut path = String::new();
                    for (dir, _) in &stack {
                        path.push_str(dir);
                        path.push('/');
                    }
                    path.push_str(&node.name);
                    out.push((i, path));
                }
            }
        }
        out
    }
}

/// Validate a directory node against the nodes parsed so far.
fn check_directory(
    nodes: &[Node],
    index: usize,
    parent: usize,
    next: usize,
    count: usize,
) -> Result<()> {
    if index == 0 {
        return if next == count {
            Ok(())
        } else {
            Err(Error::Parse("FST root does not span the node table"))
        };
    }
    if next <= index || next > count {
        return Err(Error::Parse("FST directory range out of bounds"));
    }
    if parent >= index {
        return Err(Error::Parse("FST directory has an invalid parent"));
    }
    match nodes.get(parent).map(|n| n.kind) {
        Some(NodeKind::Directory { next: parent_next, .. }) if next <= parent_next as usize => Ok(()),
        _ => Err(Error::Parse("FST directory has an invalid parent")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn build(paths: &[&str]) -> FileSystem {
        FileSystem::build(paths.iter().copied()).unwrap().0
    }

    #[test]
    fn builds_depth_first_tree() {
        let (fs, order) = FileSystem::build(["a.txt", "b/c.dat", "b/d/e.bin", "f"]).unwrap();
        let names: Vec<&str> = fs.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["", "a.txt", "b", "c.dat", "d", "e.bin", "f"]);
        assert_eq!(fs.nodes[0].kind, NodeKind::Directory { parent: 0, next: 7 });
        assert_eq!(fs.nodes[2].kind, NodeKind::Directory { parent: 0, next: 6 });
        assert_eq!(fs.nodes[4].kind, NodeKind::Directory { parent: 2, next: 6 });
        assert_eq!(order, [(1, 0), (3, 1), (5, 2), (6, 3)]);
    }

    #[test]
    fn groups_files_by_directory() {
        let (_, order) = FileSystem::build(["x/1", "y", "x/2"]).unwrap();
        // x/2 lands inside x, ahead of y.
        assert_eq!(order, [(2, 0), (3, 2), (4, 1)]);
    }

    #[test]
    fn rejects_bad_paths() {
        let cases: [&[&str]; 6] = [
            &["a//b"],
            &["/a"],
            &["../a"],
            &["a", "a"],
            &["a", "a/b"],
            &["a/b", "a"],
        ];
        for paths in cases {
            assert!(
                matches!(
                    FileSystem::build(paths.iter().copied()),
                    Err(Error::InvalidArgument(_))
                ),
                "{paths:?}"
            );
        }
    }

    #[test]
    fn write_then_parse() {
        let mut fs = build(&["a.txt", "b/c.dat"]);
        fs.set_file_location(1, 0x40, 5).unwrap();
        fs.set_file_location(3, 0x60, 3).unwrap();

        let mut buf = Vec::new();
        fs.write(&mut buf).unwrap();
        assert_eq!(buf.len(), fs.byte_len());
        // root, a.txt, b, c.dat nodes; names "\0a.txt\0b\0c.dat\0"
        assert_eq!(buf.len(), 4 * NODE_SIZE + 15);

        let parsed = FileSystem::parse(&mut &buf[..], buf.len() as u32).unwrap();
        assert_eq!(parsed, fs);
        assert_eq!(
            parsed.file_paths(),
            [(1, "a.txt".to_owned()), (3, "b/c.dat".to_owned())]
        );
    }

    #[test]
    fn empty_table_has_only_root() {
        let fs = build(&[]);
        assert_eq!(fs.nodes.len(), 1);
        assert_eq!(fs.byte_len(), NODE_SIZE + 1);
        assert!(fs.file_paths().is_empty());
    }

    #[test]
    fn rejects_file_root() {
        let mut buf = Vec::new();
        build(&["a"]).write(&mut buf).unwrap();
        buf[0] = 0;
        assert!(matches!(
            FileSystem::parse(&mut &buf[..], buf.len() as u32),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn rejects_oversized_node_count() {
        let mut buf = Vec::new();
        build(&["a"]).write(&mut buf).unwrap();
        buf[8..12].copy_from_slice(&1000u32.to_be_bytes());
        assert!(matches!(
            FileSystem::parse(&mut &buf[..], buf.len() as u32),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn rejects_directory_escaping_parent() {
        let mut buf = Vec::new();
        build(&["d/a", "b"]).write(&mut buf).unwrap();
        // Node 1 ("d") claims to extend past the 4-node table.
        buf[NODE_SIZE + 8..NODE_SIZE + 12].copy_from_slice(&5u32.to_be_bytes());
        assert!(FileSystem::parse(&mut &buf[..], buf.len() as u32).is_err());
    }

    #[test]
    fn set_location_on_directory_fails() {
        let mut fs = build(&["d/a"]);
        assert!(fs.set_file_location(1, 0, 0).is_err());
        assert!(fs.set_file_location(9, 0, 0).is_err());
    }
}
