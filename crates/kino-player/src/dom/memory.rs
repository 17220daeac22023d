//! In-memory DOM
//!
//! Backs headless players (tests, the CLI harness). Fullscreen and focus are
//! tracked per document by node id, the way a browser tracks a single
//! fullscreen element.

use super::{Document, Element, ElementRef};
use crate::{Error, Result};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

#[derive(Debug, Default)]
struct DocumentState {
    next_id: Cell<u64>,
    fullscreen: Cell<Option<u64>>,
    focused: Cell<Option<u64>>,
    fullscreen_denied: Cell<bool>,
    revoked: RefCell<Vec<String>>,
}

impl DocumentState {
    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// In-memory document with a `<body>` root
#[derive(Debug)]
pub struct MemoryDocument {
    state: Rc<DocumentState>,
    body: ElementRef,
}

impl MemoryDocument {
    pub fn new() -> Rc<Self> {
        let state = Rc::new(DocumentState::default());
        let body: ElementRef = Rc::new(MemoryElement::new("body", &state));
        Rc::new(Self { state, body })
    }

    pub fn body(&self) -> &ElementRef {
        &self.body
    }

    /// Whether `element` currently holds fullscreen
    pub fn is_fullscreen(&self, element: &ElementRef) -> bool {
        let id = MemoryElement::downcast(element).map(MemoryElement::node_id);
        id.is_some() && self.state.fullscreen.get() == id
    }

    pub fn has_fullscreen_element(&self) -> bool {
        self.state.fullscreen.get().is_some()
    }

    pub fn has_focus(&self, element: &ElementRef) -> bool {
        let id = MemoryElement::downcast(element).map(MemoryElement::node_id);
        id.is_some() && self.state.focused.get() == id
    }

    /// Make every fullscreen request fail, as a browser does without a user
    /// gesture
    pub fn deny_fullscreen(&self, denied: bool) {
        self.state.fullscreen_denied.set(denied);
    }

    pub fn revoked_urls(&self) -> Vec<String> {
        self.state.revoked.borrow().clone()
    }

    fn find(&self, predicate: &dyn Fn(&MemoryElement) -> bool) -> Option<ElementRef> {
        let mut stack = vec![self.body.clone()];
        while let Some(node) = stack.pop() {
            if let Some(element) = MemoryElement::downcast(&node) {
                if predicate(element) {
                    return Some(node.clone());
                }
                stack.extend(element.children().into_iter().rev());
            }
        }
        None
    }
}

impl Document for MemoryDocument {
    fn create_element(&self, tag: &str) -> Result<ElementRef> {
        Ok(Rc::new(MemoryElement::new(tag, &self.state)))
    }

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(Error::dom("empty selector"));
        }

        if let Some(id) = selector.strip_prefix('#') {
            return Ok(self.find(&|el: &MemoryElement| el.attribute("id").as_deref() == Some(id)));
        }

        let tag = selector.to_lowercase();
        Ok(self.find(&|el: &MemoryElement| el.tag == tag))
    }

    fn exit_fullscreen(&self) -> Result<()> {
        self.state.fullscreen.set(None);
        Ok(())
    }

    fn revoke_object_url(&self, url: &str) {
        self.state.revoked.borrow_mut().push(url.to_string());
    }
}

/// In-memory element
#[derive(Debug)]
pub struct MemoryElement {
    node_id: u64,
    tag: String,
    attributes: RefCell<BTreeMap<String, String>>,
    style: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<ElementRef>>,
    document: Weak<DocumentState>,
}

impl MemoryElement {
    fn new(tag: &str, document: &Rc<DocumentState>) -> Self {
        Self {
            node_id: document.allocate_id(),
            tag: tag.to_lowercase(),
            attributes: RefCell::new(BTreeMap::new()),
            style: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            document: Rc::downgrade(document),
        }
    }

    /// View a node handle as an in-memory element
    pub fn downcast(element: &ElementRef) -> Option<&MemoryElement> {
        element.as_any().downcast_ref::<MemoryElement>()
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn children(&self) -> Vec<ElementRef> {
        self.children.borrow().clone()
    }

    fn document(&self) -> Result<Rc<DocumentState>> {
        self.document
            .upgrade()
            .ok_or_else(|| Error::dom("element outlived its document"))
    }
}

impl Element for MemoryElement {
    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::dom(format!("invalid attribute name: {name:?}")));
        }
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, name: &str) -> Result<()> {
        self.attributes.borrow_mut().remove(name);
        Ok(())
    }

    fn style_property(&self, name: &str) -> Option<String> {
        self.style.borrow().get(name).cloned()
    }

    fn set_style_property(&self, name: &str, value: &str) -> Result<()> {
        self.style
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_style_property(&self, name: &str) -> Result<()> {
        self.style.borrow_mut().remove(name);
        Ok(())
    }

    fn append_child(&self, child: &ElementRef) -> Result<()> {
        if MemoryElement::downcast(child).is_none() {
            return Err(Error::dom("cannot adopt a foreign node"));
        }
        self.children.borrow_mut().push(child.clone());
        Ok(())
    }

    fn remove_child(&self, child: &ElementRef) -> Result<()> {
        let mut children = self.children.borrow_mut();
        match children.iter().position(|c| Rc::ptr_eq(c, child)) {
            Some(index) => {
                children.remove(index);
                Ok(())
            }
            None => Err(Error::dom("node is not a child of this element")),
        }
    }

    fn request_fullscreen(&self) -> Result<()> {
        let document = self.document()?;
        if document.fullscreen_denied.get() {
            return Err(Error::Fullscreen("request denied".into()));
        }
        document.fullscreen.set(Some(self.node_id));
        Ok(())
    }

    fn focus(&self) -> Result<()> {
        self.document()?.focused.set(Some(self.node_id));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_and_style() {
        let doc = MemoryDocument::new();
        let el = doc.create_element("DIV").unwrap();

        assert_eq!(el.tag_name(), "div");
        el.set_attribute("data-id", "1").unwrap();
        assert_eq!(el.attribute("data-id").as_deref(), Some("1"));
        el.remove_attribute("data-id").unwrap();
        assert_eq!(el.attribute("data-id"), None);
        assert!(el.set_attribute("bad name", "x").is_err());

        el.set_style_property("z-index", "10").unwrap();
        assert_eq!(el.style_property("z-index").as_deref(), Some("10"));
    }

    #[test]
    fn test_query_selector() {
        let doc = MemoryDocument::new();
        let wrapper = doc.create_element("div").unwrap();
        wrapper.set_attribute("id", "player").unwrap();
        doc.body().append_child(&wrapper).unwrap();

        let body = doc.query_selector("body").unwrap().unwrap();
        assert!(Rc::ptr_eq(&body, doc.body()));

        let found = doc.query_selector("#player").unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &wrapper));
        assert!(doc.query_selector("#missing").unwrap().is_none());
    }

    #[test]
    fn test_fullscreen_tracking() {
        let doc = MemoryDocument::new();
        let el = doc.create_element("video").unwrap();

        el.request_fullscreen().unwrap();
        assert!(doc.is_fullscreen(&el));

        doc.exit_fullscreen().unwrap();
        assert!(!doc.has_fullscreen_element());

        doc.deny_fullscreen(true);
        assert!(matches!(el.request_fullscreen(), Err(Error::Fullscreen(_))));
    }

    #[test]
    fn test_revoked_urls_are_recorded() {
        let doc = MemoryDocument::new();
        doc.revoke_object_url("blob:http://localhost/abc");
        assert_eq!(doc.revoked_urls(), vec!["blob:http://localhost/abc".to_string()]);
    }
}
