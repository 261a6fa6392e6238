//! In-memory VFS implementation.
//!
//! Nodes live in an arena (`Vec<Option<Node>>`) and refer to each other by
//! [`NodeId`]. Directories own their children through an ordered name map;
//! the `parent` link is a plain id, so the tree has no ownership cycles.
//! Freed slots are recycled.

use std::time::SystemTime;

use indexmap::IndexMap;
use memsh_types::error::{Result, ShellError};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata, WalkEntry};

/// Stable index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The root directory. Always present, never removed.
pub const ROOT: NodeId = NodeId(0);

/// Variant payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    File(Vec<u8>),
    /// Children keyed by name, in insertion order.
    Directory(IndexMap<String, NodeId>),
}

/// A file or directory in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    modified: SystemTime,
    kind: NodeKind,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            parent,
            modified: SystemTime::now(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn entry_kind(&self) -> EntryKind {
        match self.kind {
            NodeKind::File(_) => EntryKind::File,
            NodeKind::Directory(_) => EntryKind::Directory,
        }
    }

    /// Content length for files, zero for directories.
    pub fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Directory(_) => 0,
        }
    }

    fn children(&self) -> Option<&IndexMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory(children) => Some(children),
            NodeKind::File(_) => None,
        }
    }
}

/// A fully in-memory virtual file system.
#[derive(Debug)]
pub struct MemoryVfs {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    cwd: NodeId,
}

impl MemoryVfs {
    /// Create a new in-memory VFS with only the root directory.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new("", None, NodeKind::Directory(IndexMap::new())))],
            free: Vec::new(),
            cwd: ROOT,
        }
    }

    /// Borrow a live node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_ref(&self, id: NodeId) -> &Node {
        // Ids handed out by the arena stay valid until their node is freed,
        // and freed ids are never held by a live directory.
        self.nodes[id.0]
            .as_ref()
            .unwrap_or_else(|| panic!("dangling node id {}", id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0]
            .as_mut()
            .unwrap_or_else(|| panic!("dangling node id {}", id.0))
    }

    /// Resolve a path to a node, returning `None` for any failure.
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        self.lookup(path).ok()
    }

    /// Resolve a path starting from `from` (ignored for absolute paths).
    pub fn resolve_path_from(&self, path: &str, from: NodeId) -> Option<NodeId> {
        self.lookup_from(path, from).ok()
    }

    /// Resolve a path relative to the working directory.
    pub fn lookup(&self, path: &str) -> Result<NodeId> {
        self.lookup_from(path, self.cwd)
    }

    /// Resolve a path with typed errors.
    ///
    /// Handles root, `.`/`..`, repeated and trailing slashes. Walking through
    /// a file, or a trailing slash on a file, is `NotADirectory`.
    pub fn lookup_from(&self, path: &str, from: NodeId) -> Result<NodeId> {
        if path.is_empty() {
            return Err(ShellError::NoSuchPath(path.to_string()));
        }
        let mut current = if path.starts_with('/') { ROOT } else { from };
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            let node = self.node_ref(current);
            let Some(children) = node.children() else {
                return Err(ShellError::NotADirectory(path.to_string()));
            };
            current = match segment {
                "." => current,
                ".." => node.parent.unwrap_or(ROOT),
                name => *children
                    .get(name)
                    .ok_or_else(|| ShellError::NoSuchPath(path.to_string()))?,
            };
        }
        if path.len() > 1 && path.ends_with('/') && !self.node_ref(current).is_dir() {
            return Err(ShellError::NotADirectory(path.to_string()));
        }
        Ok(current)
    }

    /// Absolute path of a node.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node_ref(cur);
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Split a path into its (existing) parent directory and final name.
    fn split_parent(&self, path: &str) -> Result<(NodeId, String)> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ShellError::InvalidPath(path.to_string()));
        }
        let (parent, name) = match trimmed.rsplit_once('/') {
            Some(("", name)) => (ROOT, name),
            Some((dir, name)) => (self.lookup(dir)?, name),
            None => (self.cwd, trimmed),
        };
        if name == "." || name == ".." {
            return Err(ShellError::InvalidPath(path.to_string()));
        }
        if !self.node_ref(parent).is_dir() {
            return Err(ShellError::NotADirectory(path.to_string()));
        }
        Ok((parent, name.to_string()))
    }

    /// `split_parent` for a path that will hold a file. A trailing slash
    /// names a directory, so `name/` must already be one.
    fn split_file_parent(&self, path: &str) -> Result<(NodeId, String)> {
        let split = self.split_parent(path)?;
        if path.ends_with('/') && !matches!(self.lookup(path), Ok(id) if self.node_ref(id).is_dir()) {
            return Err(ShellError::NotADirectory(path.to_string()));
        }
        Ok(split)
    }

    fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.node_ref(dir)
            .children()
            .and_then(|c| c.get(name).copied())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            },
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            },
        }
    }

    /// Create a node under `parent`, which must be a directory without a
    /// child of the same name.
    fn attach(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        let id = self.alloc(Node::new(name, Some(parent), kind));
        self.link(parent, name, id);
        id
    }

    fn link(&mut self, parent: NodeId, name: &str, id: NodeId) {
        let dir = self.node_mut(parent);
        if let NodeKind::Directory(children) = &mut dir.kind {
            children.insert(name.to_string(), id);
        }
        dir.modified = SystemTime::now();
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, name) = {
            let node = self.node_ref(id);
            (node.parent, node.name.clone())
        };
        if let Some(parent) = parent {
            let dir = self.node_mut(parent);
            if let NodeKind::Directory(children) = &mut dir.kind {
                children.shift_remove(&name);
            }
            dir.modified = SystemTime::now();
        }
    }

    /// Release a detached subtree's arena slots.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes[cur.0].take() {
                if let NodeKind::Directory(children) = node.kind {
                    stack.extend(children.values().copied());
                }
                self.free.push(cur.0);
            }
        }
    }

    /// Whether `id` is `ancestor` or lies below it.
    fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.node_ref(cur).parent;
        }
        false
    }

    /// Resolve the destination of a move/copy: an existing directory means
    /// "into it, keeping the source name".
    fn destination(&self, to: &str, src_name: &str) -> Result<(NodeId, String)> {
        match self.lookup(to) {
            Ok(id) if self.node_ref(id).is_dir() => Ok((id, src_name.to_string())),
            _ => self.split_parent(to),
        }
    }

    /// Remove whatever sits at `parent/name` so `src` can take its place.
    fn clear_target(&mut self, parent: NodeId, name: &str, src: NodeId, to: &str) -> Result<()> {
        let Some(existing) = self.child(parent, name) else {
            return Ok(());
        };
        if existing == src {
            return Ok(());
        }
        let src_is_dir = self.node_ref(src).is_dir();
        let existing_node = self.node_ref(existing);
        match (src_is_dir, existing_node.is_dir()) {
            (false, true) => return Err(ShellError::IsADirectory(to.to_string())),
            (true, false) => return Err(ShellError::NotADirectory(to.to_string())),
            (true, true) if existing_node.children().is_some_and(|c| !c.is_empty()) => {
                return Err(ShellError::NotEmpty(to.to_string()));
            },
            _ => {},
        }
        self.unlink(existing);
        self.free_subtree(existing);
        Ok(())
    }

    fn clone_subtree(&mut self, src: NodeId, parent: NodeId, name: &str) -> NodeId {
        let kind = match &self.node_ref(src).kind {
            NodeKind::File(data) => NodeKind::File(data.clone()),
            NodeKind::Directory(_) => NodeKind::Directory(IndexMap::new()),
        };
        let copy = self.attach(parent, name, kind);
        let children: Vec<(String, NodeId)> = self
            .node_ref(src)
            .children()
            .map(|c| c.iter().map(|(n, id)| (n.clone(), *id)).collect())
            .unwrap_or_default();
        for (child_name, child) in children {
            self.clone_subtree(child, copy, &child_name);
        }
        copy
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs for MemoryVfs {
    fn read_dir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let id = self.lookup(path)?;
        let Some(children) = self.node_ref(id).children() else {
            return Err(ShellError::NotADirectory(path.to_string()));
        };
        Ok(children
            .iter()
            .map(|(name, child)| {
                let node = self.node_ref(*child);
                VfsEntry {
                    name: name.clone(),
                    kind: node.entry_kind(),
                    size: node.size(),
                }
            })
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let id = self.lookup(path)?;
        match &self.node_ref(id).kind {
            NodeKind::File(data) => Ok(data.clone()),
            NodeKind::Directory(_) => Err(ShellError::IsADirectory(path.to_string())),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let (parent, name) = self.split_file_parent(path)?;
        match self.child(parent, &name) {
            Some(id) => {
                let node = self.node_mut(id);
                match &mut node.kind {
                    NodeKind::File(content) => {
                        content.clear();
                        content.extend_from_slice(data);
                        node.modified = SystemTime::now();
                    },
                    NodeKind::Directory(_) => {
                        return Err(ShellError::IsADirectory(path.to_string()));
                    },
                }
            },
            None => {
                self.attach(parent, &name, NodeKind::File(data.to_vec()));
            },
        }
        Ok(())
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let (parent, name) = self.split_file_parent(path)?;
        match self.child(parent, &name) {
            Some(id) => {
                let node = self.node_mut(id);
                match &mut node.kind {
                    NodeKind::File(content) => {
                        content.extend_from_slice(data);
                        node.modified = SystemTime::now();
                        Ok(())
                    },
                    NodeKind::Directory(_) => Err(ShellError::IsADirectory(path.to_string())),
                }
            },
            None => {
                self.attach(parent, &name, NodeKind::File(data.to_vec()));
                Ok(())
            },
        }
    }

    fn touch(&mut self, path: &str) -> Result<()> {
        match self.lookup(path) {
            Ok(id) => {
                self.node_mut(id).modified = SystemTime::now();
                Ok(())
            },
            Err(ShellError::NoSuchPath(_)) => {
                let (parent, name) = self.split_file_parent(path)?;
                self.attach(parent, &name, NodeKind::File(Vec::new()));
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let node = self.node_ref(self.lookup(path)?);
        Ok(VfsMetadata {
            kind: node.entry_kind(),
            size: node.size(),
            modified: node.modified,
        })
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.split_parent(path)?;
        if self.child(parent, &name).is_some() {
            return Err(ShellError::AlreadyExists(path.to_string()));
        }
        self.attach(parent, &name, NodeKind::Directory(IndexMap::new()));
        Ok(())
    }

    fn mkdir_all(&mut self, path: &str) -> Result<()> {
        let mut current = if path.starts_with('/') { ROOT } else { self.cwd };
        for segment in path.split('/') {
            current = match segment {
                "" | "." => current,
                ".." => self.node_ref(current).parent.unwrap_or(ROOT),
                name => match self.child(current, name) {
                    Some(id) if self.node_ref(id).is_dir() => id,
                    Some(_) => return Err(ShellError::NotADirectory(path.to_string())),
                    None => self.attach(current, name, NodeKind::Directory(IndexMap::new())),
                },
            };
        }
        Ok(())
    }

    fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        let id = self.lookup(path)?;
        if id == ROOT {
            return Err(ShellError::InvalidPath(path.to_string()));
        }
        let node = self.node_ref(id);
        if !recursive && node.children().is_some_and(|c| !c.is_empty()) {
            return Err(ShellError::NotEmpty(path.to_string()));
        }
        let parent = node.parent.unwrap_or(ROOT);
        if self.is_within(self.cwd, id) {
            self.cwd = parent;
        }
        self.unlink(id);
        self.free_subtree(id);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let src = self.lookup(from)?;
        if src == ROOT {
            return Err(ShellError::InvalidPath(from.to_string()));
        }
        let src_name = self.node_ref(src).name.clone();
        let (parent, name) = self.destination(to, &src_name)?;
        if self.is_within(parent, src) {
            return Err(ShellError::InvalidPath(to.to_string()));
        }
        self.clear_target(parent, &name, src, to)?;
        self.unlink(src);
        let node = self.node_mut(src);
        node.name = name.clone();
        node.parent = Some(parent);
        self.link(parent, &name, src);
        Ok(())
    }

    fn copy(&mut self, from: &str, to: &str, recursive: bool) -> Result<()> {
        let src = self.lookup(from)?;
        let src_node = self.node_ref(src);
        let src_is_dir = src_node.is_dir();
        if src_is_dir && !recursive {
            return Err(ShellError::IsADirectory(from.to_string()));
        }
        if src == ROOT {
            return Err(ShellError::InvalidPath(from.to_string()));
        }
        let src_name = src_node.name.clone();
        let (parent, name) = self.destination(to, &src_name)?;
        if src_is_dir && self.is_within(parent, src) {
            return Err(ShellError::InvalidPath(to.to_string()));
        }
        if self.child(parent, &name) == Some(src) {
            return Err(ShellError::AlreadyExists(to.to_string()));
        }
        self.clear_target(parent, &name, src, to)?;
        self.clone_subtree(src, parent, &name);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    fn walk(&self, path: &str) -> Result<Vec<WalkEntry>> {
        let id = self.lookup(path)?;
        if !self.node_ref(id).is_dir() {
            return Err(ShellError::NotADirectory(path.to_string()));
        }
        let mut out = Vec::new();
        // (node, relative path) pairs; children pushed in reverse so the
        // walk comes out depth first in insertion order.
        let mut stack: Vec<(NodeId, String)> = Vec::new();
        let push_children = |stack: &mut Vec<(NodeId, String)>, dir: NodeId, prefix: &str| {
            if let Some(children) = self.node_ref(dir).children() {
                for (name, child) in children.iter().rev() {
                    let rel = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}/{name}")
                    };
                    stack.push((*child, rel));
                }
            }
        };
        push_children(&mut stack, id, "");
        while let Some((cur, rel)) = stack.pop() {
            let kind = self.node_ref(cur).entry_kind();
            if kind == EntryKind::Directory {
                push_children(&mut stack, cur, &rel);
            }
            out.push(WalkEntry { path: rel, kind });
        }
        Ok(out)
    }

    fn current_dir(&self) -> String {
        self.path_of(self.cwd)
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        let id = self.lookup(path)?;
        if !self.node_ref(id).is_dir() {
            return Err(ShellError::NotADirectory(path.to_string()));
        }
        self.cwd = id;
        Ok(())
    }
}
