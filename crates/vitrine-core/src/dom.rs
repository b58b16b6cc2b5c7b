#![forbid(unsafe_code)]

//! Document host abstraction.
//!
//! Controllers never touch a browser API directly. They read and write page
//! state through the [`Dom`] trait. [`Document`] implements it in memory;
//! an embedding host implements it over real nodes.
//!
//! # Invariants
//!
//! - [`ElementId`]s are never reused within one document.
//! - `focusable_within` returns elements in document (pre-order) order.
//! - Removing an element removes its subtree; if focus was inside it, focus
//!   is cleared.
//!
//! # Failure Modes
//!
//! - Mutating an unknown or removed element returns
//!   [`DomError::UnknownElement`]; getters return `None`.

use ahash::{AHashMap, AHashSet};
use thiserror::Error;

use crate::geometry::{Bounds, Viewport};

/// Opaque handle to a document element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    /// Wrap a raw handle (host bindings keep their own node table).
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Errors raised by document mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("element {0:?} does not exist")]
    UnknownElement(ElementId),
    #[error("no element with id `{0}`")]
    MissingId(String),
    #[error("element {0:?} has no parent")]
    Detached(ElementId),
}

/// How a programmatic scroll is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Instant,
    Smooth,
}

/// Page state accessed by controllers.
pub trait Dom {
    // --- Lookup ---

    fn element_by_id(&self, html_id: &str) -> Option<ElementId>;
    fn html_id(&self, el: ElementId) -> Option<String>;
    /// Assign (or reassign) the HTML id of an element.
    fn set_html_id(&mut self, el: ElementId, html_id: &str) -> Result<(), DomError>;
    fn exists(&self, el: ElementId) -> bool;

    /// Look up a required element by its HTML id.
    fn require(&self, html_id: &str) -> Result<ElementId, DomError> {
        self.element_by_id(html_id)
            .ok_or_else(|| DomError::MissingId(html_id.to_string()))
    }

    // --- Tree ---

    fn create_element(&mut self, tag: &str, parent: Option<ElementId>) -> ElementId;
    /// Create an element directly after `sibling` under the same parent.
    fn insert_after(&mut self, tag: &str, sibling: ElementId) -> Result<ElementId, DomError>;
    fn remove_element(&mut self, el: ElementId) -> Result<(), DomError>;
    fn parent(&self, el: ElementId) -> Option<ElementId>;
    fn children(&self, el: ElementId) -> Vec<ElementId>;
    /// Whether `el` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, el: ElementId) -> bool;
    /// Enabled, focusable descendants of `container` in document order.
    fn focusable_within(&self, container: ElementId) -> Vec<ElementId>;
    fn elements_with_class(&self, class: &str) -> Vec<ElementId>;

    // --- Classes, attributes, styles, text ---

    fn add_class(&mut self, el: ElementId, class: &str) -> Result<(), DomError>;
    fn remove_class(&mut self, el: ElementId, class: &str) -> Result<(), DomError>;
    fn has_class(&self, el: ElementId, class: &str) -> bool;

    fn toggle_class(&mut self, el: ElementId, class: &str, on: bool) -> Result<(), DomError> {
        if on {
            self.add_class(el, class)
        } else {
            self.remove_class(el, class)
        }
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) -> Result<(), DomError>;
    fn remove_attribute(&mut self, el: ElementId, name: &str) -> Result<(), DomError>;
    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) -> Result<(), DomError>;
    fn remove_style(&mut self, el: ElementId, property: &str) -> Result<(), DomError>;
    fn style(&self, el: ElementId, property: &str) -> Option<String>;

    fn set_text(&mut self, el: ElementId, text: &str) -> Result<(), DomError>;
    fn text(&self, el: ElementId) -> Option<String>;

    // --- Form controls ---

    fn value(&self, el: ElementId) -> Option<String>;
    fn set_value(&mut self, el: ElementId, value: &str) -> Result<(), DomError>;
    fn set_disabled(&mut self, el: ElementId, disabled: bool) -> Result<(), DomError>;
    fn is_disabled(&self, el: ElementId) -> bool;

    // --- Layout & scrolling ---

    fn bounds(&self, el: ElementId) -> Option<Bounds>;
    fn viewport(&self) -> Viewport;
    fn scroll_y(&self) -> f64;
    fn scroll_to(&mut self, y: f64, behavior: ScrollBehavior);

    // --- Focus ---

    fn active_element(&self) -> Option<ElementId>;
    fn focus(&mut self, el: ElementId) -> Result<(), DomError>;
    fn blur_active(&mut self);

    // --- Page scroll lock (`body { overflow: hidden }`) ---
    //
    // The lock is held per owner. The page stays locked while any owner
    // holds it, so one controller releasing never unlocks another's hold.

    /// Take the lock for `owner`. Returns `false` if `owner` already held it.
    fn acquire_scroll_lock(&mut self, owner: &'static str) -> bool;
    /// Drop `owner`'s hold. Returns `false` if `owner` held nothing.
    fn release_scroll_lock(&mut self, owner: &'static str) -> bool;
    fn holds_scroll_lock(&self, owner: &'static str) -> bool;
    fn is_scroll_locked(&self) -> bool;
}

const FOCUSABLE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    html_id: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    classes: AHashSet<String>,
    attributes: AHashMap<String, String>,
    styles: AHashMap<String, String>,
    text: String,
    value: String,
    disabled: bool,
    focusable: bool,
    bounds: Bounds,
}

impl Node {
    fn new(tag: &str, parent: Option<ElementId>) -> Self {
        let tag = tag.to_ascii_lowercase();
        let focusable = FOCUSABLE_TAGS.contains(&tag.as_str());
        Self {
            tag,
            html_id: None,
            parent,
            children: Vec::new(),
            classes: AHashSet::new(),
            attributes: AHashMap::new(),
            styles: AHashMap::new(),
            text: String::new(),
            value: String::new(),
            disabled: false,
            focusable,
            bounds: Bounds::default(),
        }
    }
}

/// In-memory document.
///
/// Used for headless operation and as the reference implementation of
/// [`Dom`] in tests. Layout is not computed: callers assign section
/// [`Bounds`] explicitly with [`Document::set_bounds`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: AHashMap<ElementId, Node>,
    ids: AHashMap<String, ElementId>,
    roots: Vec<ElementId>,
    next_id: u32,
    viewport: Viewport,
    scroll_y: f64,
    last_scroll_behavior: Option<ScrollBehavior>,
    active: Option<ElementId>,
    scroll_locks: Vec<&'static str>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Document {
    /// Create an empty document with the given viewport.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: AHashMap::new(),
            ids: AHashMap::new(),
            roots: Vec::new(),
            next_id: 1,
            viewport,
            scroll_y: 0.0,
            last_scroll_behavior: None,
            active: None,
            scroll_locks: Vec::new(),
        }
    }

    /// Create an element and assign it an HTML id.
    pub fn append_with_id(
        &mut self,
        tag: &str,
        parent: Option<ElementId>,
        html_id: &str,
    ) -> ElementId {
        let el = self.create_element(tag, parent);
        self.assign_html_id(el, html_id);
        el
    }

    fn assign_html_id(&mut self, el: ElementId, html_id: &str) -> bool {
        let Some(node) = self.nodes.get_mut(&el) else {
            return false;
        };
        if let Some(old) = node.html_id.replace(html_id.to_string()) {
            self.ids.remove(&old);
        }
        self.ids.insert(html_id.to_string(), el);
        true
    }

    /// Set the layout extent of an element.
    pub fn set_bounds(&mut self, el: ElementId, bounds: Bounds) {
        if let Some(node) = self.nodes.get_mut(&el) {
            node.bounds = bounds;
        }
    }

    /// Override tag-based focusability (e.g. `tabindex="0"`).
    pub fn set_focusable(&mut self, el: ElementId, focusable: bool) {
        if let Some(node) = self.nodes.get_mut(&el) {
            node.focusable = focusable;
        }
    }

    /// Simulate a user scroll (no programmatic behavior recorded).
    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll_y = y.max(0.0);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Behavior of the most recent programmatic scroll, if any.
    pub fn last_scroll_behavior(&self) -> Option<ScrollBehavior> {
        self.last_scroll_behavior
    }

    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(&el).map(|n| n.tag.as_str())
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_mut(&mut self, el: ElementId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(&el).ok_or(DomError::UnknownElement(el))
    }

    fn alloc(&mut self, node: Node) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn preorder(&self, start: ElementId, out: &mut Vec<ElementId>) {
        let mut stack = vec![start];
        while let Some(el) = stack.pop() {
            out.push(el);
            if let Some(node) = self.nodes.get(&el) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    fn all_preorder(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.preorder(root, &mut out);
        }
        out
    }
}

impl Dom for Document {
    fn element_by_id(&self, html_id: &str) -> Option<ElementId> {
        self.ids.get(html_id).copied()
    }

    fn html_id(&self, el: ElementId) -> Option<String> {
        self.nodes.get(&el).and_then(|n| n.html_id.clone())
    }

    fn set_html_id(&mut self, el: ElementId, html_id: &str) -> Result<(), DomError> {
        if self.assign_html_id(el, html_id) {
            Ok(())
        } else {
            Err(DomError::UnknownElement(el))
        }
    }

    fn exists(&self, el: ElementId) -> bool {
        self.nodes.contains_key(&el)
    }

    fn create_element(&mut self, tag: &str, parent: Option<ElementId>) -> ElementId {
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        let id = self.alloc(Node::new(tag, parent));
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn insert_after(&mut self, tag: &str, sibling: ElementId) -> Result<ElementId, DomError> {
        let parent = self
            .nodes
            .get(&sibling)
            .ok_or(DomError::UnknownElement(sibling))?
            .parent;
        let id = self.alloc(Node::new(tag, parent));
        let siblings = match parent {
            Some(p) => &mut self.node_mut(p)?.children,
            None => &mut self.roots,
        };
        let pos = siblings
            .iter()
            .position(|&s| s == sibling)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(pos, id);
        Ok(id)
    }

    fn remove_element(&mut self, el: ElementId) -> Result<(), DomError> {
        let parent = self.nodes.get(&el).ok_or(DomError::UnknownElement(el))?.parent;
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => p.children.retain(|&c| c != el),
            None => self.roots.retain(|&c| c != el),
        }
        let mut subtree = Vec::new();
        self.preorder(el, &mut subtree);
        for id in subtree {
            if let Some(node) = self.nodes.remove(&id)
                && let Some(html_id) = node.html_id
            {
                self.ids.remove(&html_id);
            }
            if self.active == Some(id) {
                self.active = None;
            }
        }
        Ok(())
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.nodes.get(&el).and_then(|n| n.parent)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(&el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn contains(&self, ancestor: ElementId, el: ElementId) -> bool {
        let mut cursor = Some(el);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    fn focusable_within(&self, container: ElementId) -> Vec<ElementId> {
        let mut all = Vec::new();
        self.preorder(container, &mut all);
        all.into_iter()
            .filter(|&el| el != container)
            .filter(|el| {
                self.nodes.get(el).is_some_and(|n| {
                    n.focusable
                        && !n.disabled
                        && n.styles.get("display").is_none_or(|d| d != "none")
                })
            })
            .collect()
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementId> {
        self.all_preorder()
            .into_iter()
            .filter(|el| self.nodes.get(el).is_some_and(|n| n.classes.contains(class)))
            .collect()
    }

    fn add_class(&mut self, el: ElementId, class: &str) -> Result<(), DomError> {
        self.node_mut(el)?.classes.insert(class.to_string());
        Ok(())
    }

    fn remove_class(&mut self, el: ElementId, class: &str) -> Result<(), DomError> {
        self.node_mut(el)?.classes.remove(class);
        Ok(())
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.nodes.get(&el).is_some_and(|n| n.classes.contains(class))
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(el)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, el: ElementId, name: &str) -> Result<(), DomError> {
        self.node_mut(el)?.attributes.remove(name);
        Ok(())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.nodes.get(&el).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(el)?
            .styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn remove_style(&mut self, el: ElementId, property: &str) -> Result<(), DomError> {
        self.node_mut(el)?.styles.remove(property);
        Ok(())
    }

    fn style(&self, el: ElementId, property: &str) -> Option<String> {
        self.nodes.get(&el).and_then(|n| n.styles.get(property).cloned())
    }

    fn set_text(&mut self, el: ElementId, text: &str) -> Result<(), DomError> {
        self.node_mut(el)?.text = text.to_string();
        Ok(())
    }

    fn text(&self, el: ElementId) -> Option<String> {
        self.nodes.get(&el).map(|n| n.text.clone())
    }

    fn value(&self, el: ElementId) -> Option<String> {
        self.nodes.get(&el).map(|n| n.value.clone())
    }

    fn set_value(&mut self, el: ElementId, value: &str) -> Result<(), DomError> {
        self.node_mut(el)?.value = value.to_string();
        Ok(())
    }

    fn set_disabled(&mut self, el: ElementId, disabled: bool) -> Result<(), DomError> {
        self.node_mut(el)?.disabled = disabled;
        Ok(())
    }

    fn is_disabled(&self, el: ElementId) -> bool {
        self.nodes.get(&el).is_some_and(|n| n.disabled)
    }

    fn bounds(&self, el: ElementId) -> Option<Bounds> {
        self.nodes.get(&el).map(|n| n.bounds)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn scroll_to(&mut self, y: f64, behavior: ScrollBehavior) {
        self.scroll_y = y.max(0.0);
        self.last_scroll_behavior = Some(behavior);
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    fn focus(&mut self, el: ElementId) -> Result<(), DomError> {
        if !self.nodes.contains_key(&el) {
            return Err(DomError::UnknownElement(el));
        }
        self.active = Some(el);
        Ok(())
    }

    fn blur_active(&mut self) {
        self.active = None;
    }

    fn acquire_scroll_lock(&mut self, owner: &'static str) -> bool {
        if self.scroll_locks.contains(&owner) {
            return false;
        }
        self.scroll_locks.push(owner);
        true
    }

    fn release_scroll_lock(&mut self, owner: &'static str) -> bool {
        let before = self.scroll_locks.len();
        self.scroll_locks.retain(|held| *held != owner);
        self.scroll_locks.len() != before
    }

    fn holds_scroll_lock(&self, owner: &'static str) -> bool {
        self.scroll_locks.contains(&owner)
    }

    fn is_scroll_locked(&self) -> bool {
        !self.scroll_locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_are_unique_and_resolvable() {
        let mut doc = Document::default();
        let a = doc.append_with_id("div", None, "a");
        let b = doc.append_with_id("div", Some(a), "b");
        assert_ne!(a, b);
        assert_eq!(doc.element_by_id("a"), Some(a));
        assert_eq!(doc.element_by_id("b"), Some(b));
        assert_eq!(doc.html_id(b).as_deref(), Some("b"));
        assert_eq!(doc.require("missing"), Err(DomError::MissingId("missing".into())));
    }

    #[test]
    fn focusable_within_is_document_order() {
        let mut doc = Document::default();
        let root = doc.create_element("nav", None);
        let first = doc.create_element("a", Some(root));
        let group = doc.create_element("div", Some(root));
        let nested = doc.create_element("button", Some(group));
        let disabled = doc.create_element("input", Some(group));
        doc.set_disabled(disabled, true).unwrap();
        let last = doc.create_element("textarea", Some(root));
        let custom = doc.create_element("div", Some(root));
        doc.set_focusable(custom, true);

        assert_eq!(doc.focusable_within(root), vec![first, nested, last, custom]);
    }

    #[test]
    fn hidden_elements_are_not_focusable() {
        let mut doc = Document::default();
        let root = doc.create_element("div", None);
        let button = doc.create_element("button", Some(root));
        doc.set_style(button, "display", "none").unwrap();
        assert!(doc.focusable_within(root).is_empty());
    }

    #[test]
    fn insert_after_places_sibling() {
        let mut doc = Document::default();
        let form = doc.create_element("form", None);
        let a = doc.create_element("input", Some(form));
        let b = doc.create_element("input", Some(form));
        let err = doc.insert_after("div", a).unwrap();
        assert_eq!(doc.children(form), vec![a, err, b]);
        assert_eq!(doc.parent(err), Some(form));
    }

    #[test]
    fn remove_subtree_clears_focus_and_ids() {
        let mut doc = Document::default();
        let root = doc.append_with_id("div", None, "root");
        let inner = doc.append_with_id("button", Some(root), "inner");
        doc.focus(inner).unwrap();
        doc.remove_element(root).unwrap();
        assert!(!doc.exists(inner));
        assert_eq!(doc.active_element(), None);
        assert_eq!(doc.element_by_id("inner"), None);
        assert_eq!(
            doc.add_class(inner, "x"),
            Err(DomError::UnknownElement(inner))
        );
    }

    #[test]
    fn contains_walks_ancestors() {
        let mut doc = Document::default();
        let root = doc.create_element("div", None);
        let child = doc.create_element("div", Some(root));
        let other = doc.create_element("div", None);
        assert!(doc.contains(root, child));
        assert!(doc.contains(root, root));
        assert!(!doc.contains(child, root));
        assert!(!doc.contains(root, other));
    }

    #[test]
    fn programmatic_scroll_records_behavior() {
        let mut doc = Document::default();
        doc.set_scroll_y(40.0);
        assert_eq!(doc.last_scroll_behavior(), None);
        doc.scroll_to(-10.0, ScrollBehavior::Smooth);
        assert_eq!(doc.scroll_y(), 0.0);
        assert_eq!(doc.last_scroll_behavior(), Some(ScrollBehavior::Smooth));
    }

    #[test]
    fn scroll_lock_is_held_per_owner() {
        let mut doc = Document::default();
        assert!(doc.acquire_scroll_lock("menu"));
        assert!(!doc.acquire_scroll_lock("menu"));
        assert!(doc.acquire_scroll_lock("modal"));
        assert!(doc.release_scroll_lock("menu"));
        assert!(doc.is_scroll_locked());
        assert!(doc.holds_scroll_lock("modal"));
        assert!(!doc.release_scroll_lock("menu"));
        assert!(doc.release_scroll_lock("modal"));
        assert!(!doc.is_scroll_locked());
    }
}
