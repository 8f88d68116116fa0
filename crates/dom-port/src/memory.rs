//! In-process document: an arena of nodes with explicit layout boxes.
//!
//! Layout is not computed; tests and fixtures assign each node's box. Every
//! structural change and attribute write is announced on the document's
//! [`LayoutBus`] as a mutation; box changes as resize, scrolling as scroll.
//! Inline style writes are not announced.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dockwright_core_types::{InsertionRelation, Rect, Viewport};
use dockwright_event_bus::{EventBus, InMemoryBus, LayoutBus, LayoutSignal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::errors::{DomError, SelectorError};
use crate::selector::{SelectorList, SelectorSubject};
use crate::{ComputedVisibility, Document, DomElement, ElementHandle, ElementRef, NodeKey};

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

const BUS_CAPACITY: usize = 256;

/// Serializable page description used by fixtures and the CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFixture {
    pub url: String,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub body: Vec<NodeFixture>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFixture {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub children: Vec<NodeFixture>,
}

#[derive(Debug)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    rect: Rect,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
            rect: Rect::default(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Tree {
    id: u64,
    url: String,
    viewport: Viewport,
    nodes: Vec<NodeData>,
    root: usize,
    body: usize,
}

impl Tree {
    fn is_connected(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == self.root {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: usize, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    fn style(&self, index: usize, property: &str) -> Option<&str> {
        self.nodes[index].style.get(property).map(String::as_str)
    }

    fn visibility(&self, index: usize) -> ComputedVisibility {
        let mut display_none = false;
        let mut visibility_hidden = None;
        let mut opacity = 1.0;
        let mut current = Some(index);
        while let Some(i) = current {
            if self.style(i, "display") == Some("none") {
                display_none = true;
            }
            if visibility_hidden.is_none() {
                visibility_hidden = match self.style(i, "visibility") {
                    Some("hidden") | Some("collapse") => Some(true),
                    Some("visible") => Some(false),
                    _ => None,
                };
            }
            if let Some(value) = self.style(i, "opacity").and_then(|v| v.trim().parse::<f64>().ok()) {
                opacity *= value.clamp(0.0, 1.0);
            }
            current = self.nodes[i].parent;
        }
        ComputedVisibility {
            display_none,
            visibility_hidden: visibility_hidden.unwrap_or(false),
            opacity,
            position_fixed: self.style(index, "position") == Some("fixed"),
        }
    }

    /// Preorder walk below `index`, excluding it.
    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }

    fn detach(&mut self, index: usize) -> bool {
        let Some(parent) = self.nodes[index].parent.take() else {
            return false;
        };
        self.nodes[parent].children.retain(|child| *child != index);
        true
    }

    fn push_node(&mut self, data: NodeData) -> usize {
        self.nodes.push(data);
        self.nodes.len() - 1
    }
}

#[derive(Clone, Copy)]
struct TreeNode<'a> {
    tree: &'a Tree,
    index: usize,
}

impl SelectorSubject for TreeNode<'_> {
    fn local_name(&self) -> String {
        self.tree.nodes[self.index].tag.clone()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.tree.nodes[self.index].attrs.get(name).cloned()
    }

    fn parent_element(&self) -> Option<Self> {
        self.tree.nodes[self.index].parent.map(|index| TreeNode {
            tree: self.tree,
            index,
        })
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let parent = self.tree.nodes[self.index].parent?;
        let siblings = &self.tree.nodes[parent].children;
        let position = siblings.iter().position(|child| *child == self.index)?;
        position.checked_sub(1).map(|prev| TreeNode {
            tree: self.tree,
            index: siblings[prev],
        })
    }
}

/// Shared handle to an in-memory document. Clones point at the same tree.
#[derive(Clone)]
pub struct MemoryDocument {
    tree: Arc<RwLock<Tree>>,
    bus: Arc<LayoutBus>,
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        f.debug_struct("MemoryDocument")
            .field("id", &tree.id)
            .field("url", &tree.url)
            .field("nodes", &tree.nodes.len())
            .finish()
    }
}

impl MemoryDocument {
    pub fn new(url: impl Into<String>, viewport: Viewport) -> Self {
        let mut nodes = Vec::new();
        let mut html = NodeData::new("html");
        html.rect = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        nodes.push(html);
        let mut body = NodeData::new("body");
        body.rect = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        body.parent = Some(0);
        nodes.push(body);
        nodes[0].children.push(1);

        let tree = Tree {
            id: NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed),
            url: url.into(),
            viewport,
            nodes,
            root: 0,
            body: 1,
        };
        Self {
            tree: Arc::new(RwLock::new(tree)),
            bus: InMemoryBus::new(BUS_CAPACITY),
        }
    }

    pub fn from_fixture(fixture: &PageFixture) -> Self {
        let document = Self::new(fixture.url.clone(), fixture.viewport);
        let body = document.body();
        for node in &fixture.body {
            document.build_fixture_node(&body, node);
        }
        document
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let fixture: PageFixture = serde_json::from_str(raw)?;
        Ok(Self::from_fixture(&fixture))
    }

    fn build_fixture_node(&self, parent: &ElementRef, fixture: &NodeFixture) {
        let attrs: Vec<(&str, &str)> = fixture
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let element = self.append(parent, &fixture.tag, &attrs);
        for (property, value) in &fixture.style {
            element.set_style(property, Some(value));
        }
        if let Some(rect) = fixture.rect {
            self.set_rect(&element, rect);
        }
        for child in &fixture.children {
            self.build_fixture_node(&element, child);
        }
    }

    fn id(&self) -> u64 {
        self.tree.read().id
    }

    fn handle(&self, index: usize) -> ElementRef {
        Arc::new(MemoryElement {
            tree: Arc::downgrade(&self.tree),
            bus: Arc::downgrade(&self.bus),
            key: NodeKey {
                document: self.id(),
                node: index as u64,
            },
        })
    }

    fn index_of(&self, element: &ElementRef) -> Result<usize, DomError> {
        let key = element.key();
        let tree = self.tree.read();
        if key.document != tree.id || key.node as usize >= tree.nodes.len() {
            return Err(DomError::ForeignNode);
        }
        Ok(key.node as usize)
    }

    /// Append a new element under `parent` and return it.
    pub fn append(&self, parent: &ElementRef, tag: &str, attrs: &[(&str, &str)]) -> ElementRef {
        let index = {
            let mut tree = self.tree.write();
            let parent_index = match parent.key() {
                key if key.document == tree.id && (key.node as usize) < tree.nodes.len() => {
                    key.node as usize
                }
                _ => tree.body,
            };
            let mut data = NodeData::new(tag);
            for (name, value) in attrs {
                data.attrs.insert(name.to_ascii_lowercase(), value.to_string());
            }
            data.parent = Some(parent_index);
            let index = tree.push_node(data);
            tree.nodes[parent_index].children.push(index);
            index
        };
        self.bus.emit(LayoutSignal::Mutation);
        self.handle(index)
    }

    /// Convenience for tests: append and give the element a box in one step.
    pub fn append_with_rect(
        &self,
        parent: &ElementRef,
        tag: &str,
        attrs: &[(&str, &str)],
        rect: Rect,
    ) -> ElementRef {
        let element = self.append(parent, tag, attrs);
        self.set_rect(&element, rect);
        element
    }

    pub fn set_rect(&self, element: &ElementRef, rect: Rect) {
        if let Ok(index) = self.index_of(element) {
            self.tree.write().nodes[index].rect = rect;
            self.bus.emit(LayoutSignal::Resize);
        }
    }

    /// Scroll the page: every non-fixed box moves by the opposite amount.
    pub fn scroll_by(&self, dx: f64, dy: f64) {
        {
            let mut tree = self.tree.write();
            let (root, body) = (tree.root, tree.body);
            for index in 0..tree.nodes.len() {
                if index == root || index == body || tree.style(index, "position") == Some("fixed") {
                    continue;
                }
                let rect = tree.nodes[index].rect;
                tree.nodes[index].rect = rect.translate(-dx, -dy);
            }
        }
        self.bus.emit(LayoutSignal::Scroll);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.tree.write().viewport = viewport;
        self.bus.emit(LayoutSignal::Resize);
    }

    /// Same-document navigation (history push).
    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        self.tree.write().url = url.clone();
        self.bus.emit(LayoutSignal::Navigation(url));
    }

    /// Forward a raw host notification onto the bus.
    pub fn notify(&self, signal: LayoutSignal) {
        trace!(target: "dockwright::dom", signal = signal.name(), "notify");
        self.bus.emit(signal);
    }

    pub fn bus(&self) -> Arc<LayoutBus> {
        Arc::clone(&self.bus)
    }

    /// Number of connected elements matching `selector`; zero for bad selectors.
    pub fn count(&self, selector: &str) -> usize {
        self.query_selector_all(selector)
            .map(|found| found.len())
            .unwrap_or(0)
    }
}

impl Document for MemoryDocument {
    fn url(&self) -> String {
        self.tree.read().url.clone()
    }

    fn viewport(&self) -> Viewport {
        self.tree.read().viewport
    }

    fn body(&self) -> ElementRef {
        let body = self.tree.read().body;
        self.handle(body)
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let matched: Vec<usize> = {
            let tree = self.tree.read();
            let mut order = vec![tree.root];
            order.extend(tree.descendants(tree.root));
            order
                .into_iter()
                .filter(|index| {
                    list.matches(&TreeNode {
                        tree: &*tree,
                        index: *index,
                    })
                })
                .collect()
        };
        Ok(matched.into_iter().map(|index| self.handle(index)).collect())
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        let found = {
            let tree = self.tree.read();
            tree.descendants(tree.root)
                .into_iter()
                .find(|index| tree.nodes[*index].attrs.get("id").map(String::as_str) == Some(id))
        };
        found.map(|index| self.handle(index))
    }

    fn create_element(&self, tag: &str) -> ElementRef {
        let index = self.tree.write().push_node(NodeData::new(tag));
        self.handle(index)
    }

    fn insert(
        &self,
        node: &ElementRef,
        container: &ElementRef,
        reference: Option<&ElementRef>,
        relation: InsertionRelation,
    ) -> Result<(), DomError> {
        let node_index = self.index_of(node)?;
        let container_index = self.index_of(container)?;
        let reference_index = reference.map(|r| self.index_of(r)).transpose()?;
        {
            let mut tree = self.tree.write();
            if tree.is_ancestor_or_self(node_index, container_index) {
                return Err(DomError::Hierarchy);
            }
            if let Some(reference_index) = reference_index {
                if reference_index == node_index {
                    return Err(DomError::Hierarchy);
                }
                if relation != InsertionRelation::Append
                    && tree.nodes[reference_index].parent != Some(container_index)
                {
                    return Err(DomError::NotAChild);
                }
            }
            tree.detach(node_index);

            let children = &tree.nodes[container_index].children;
            let position = match (relation, reference_index) {
                (InsertionRelation::Append, _) | (_, None) => children.len(),
                (relation, Some(reference_index)) => {
                    let at = children
                        .iter()
                        .position(|child| *child == reference_index)
                        .ok_or(DomError::NotAChild)?;
                    if relation == InsertionRelation::After {
                        at + 1
                    } else {
                        at
                    }
                }
            };
            tree.nodes[container_index].children.insert(position, node_index);
            tree.nodes[node_index].parent = Some(container_index);
        }
        self.bus.emit(LayoutSignal::Mutation);
        Ok(())
    }

    fn remove(&self, node: &ElementRef) {
        let Ok(index) = self.index_of(node) else {
            return;
        };
        let detached = self.tree.write().detach(index);
        if detached {
            self.bus.emit(LayoutSignal::Mutation);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LayoutSignal> {
        self.bus.subscribe()
    }
}

/// Non-owning element handle into a [`MemoryDocument`].
pub struct MemoryElement {
    tree: Weak<RwLock<Tree>>,
    bus: Weak<LayoutBus>,
    key: NodeKey,
}

impl MemoryElement {
    fn read<R>(&self, f: impl FnOnce(&Tree, usize) -> R) -> Option<R> {
        let tree = self.tree.upgrade()?;
        let guard = tree.read();
        Some(f(&guard, self.key.node as usize))
    }

    fn sibling_handle(&self, index: usize) -> ElementRef {
        Arc::new(MemoryElement {
            tree: self.tree.clone(),
            bus: self.bus.clone(),
            key: NodeKey {
                document: self.key.document,
                node: index as u64,
            },
        })
    }
}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self
            .read(|tree, index| tree.nodes[index].tag.clone())
            .unwrap_or_default();
        f.debug_struct("MemoryElement")
            .field("node", &self.key.node)
            .field("tag", &tag)
            .finish()
    }
}

impl ElementHandle for MemoryElement {
    fn key(&self) -> NodeKey {
        self.key
    }

    fn is_connected(&self) -> bool {
        self.read(|tree, index| tree.is_connected(index))
            .unwrap_or(false)
    }

    fn bounding_box(&self) -> Rect {
        self.read(|tree, index| {
            if tree.visibility(index).display_none {
                Rect::default()
            } else {
                tree.nodes[index].rect
            }
        })
        .unwrap_or_default()
    }

    fn computed_visibility(&self) -> ComputedVisibility {
        self.read(|tree, index| tree.visibility(index))
            .unwrap_or_default()
    }

    fn is_disabled(&self) -> bool {
        self.read(|tree, index| {
            let attrs = &tree.nodes[index].attrs;
            attrs.contains_key("disabled")
                || attrs.contains_key("readonly")
                || attrs.get("aria-disabled").map(String::as_str) == Some("true")
        })
        .unwrap_or(true)
    }
}

impl DomElement for MemoryElement {
    fn tag_name(&self) -> String {
        self.read(|tree, index| tree.nodes[index].tag.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.read(|tree, index| tree.nodes[index].attrs.get(name).cloned())
            .flatten()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        tree.write().nodes[self.key.node as usize]
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        if let Some(bus) = self.bus.upgrade() {
            bus.emit(LayoutSignal::Mutation);
        }
    }

    fn parent(&self) -> Option<ElementRef> {
        self.read(|tree, index| tree.nodes[index].parent)
            .flatten()
            .map(|index| self.sibling_handle(index))
    }

    fn children(&self) -> Vec<ElementRef> {
        self.read(|tree, index| tree.nodes[index].children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|index| self.sibling_handle(index))
            .collect()
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let matched = self
            .read(|tree, index| {
                tree.descendants(index)
                    .into_iter()
                    .filter(|i| list.matches(&TreeNode { tree, index: *i }))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(matched
            .into_iter()
            .map(|index| self.sibling_handle(index))
            .collect())
    }

    fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .read(|tree, index| list.matches(&TreeNode { tree, index }))
            .unwrap_or(false))
    }

    fn style(&self, property: &str) -> Option<String> {
        self.read(|tree, index| tree.style(index, property).map(str::to_string))
            .flatten()
    }

    fn set_style(&self, property: &str, value: Option<&str>) {
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        let mut guard = tree.write();
        let style = &mut guard.nodes[self.key.node as usize].style;
        match value {
            Some(value) => {
                style.insert(property.to_string(), value.to_string());
            }
            None => {
                style.remove(property);
            }
        }
    }

    fn to_ref(&self) -> ElementRef {
        self.sibling_handle(self.key.node as usize)
    }
}
