//! Headless host document.
//!
//! The widget never owns its page. It looks up a handful of elements by fixed id, toggles
//! their visibility, swaps their content and adds short-lived elements (tooltip, anchors,
//! off-screen work areas). [`Document`] models exactly that much of a page.

use crate::render::PreviewHandle;
use std::collections::HashMap;

pub const FORM_ID: &str = "qr-form";
pub const INPUT_ID: &str = "qr-url";
pub const PREVIEW_ID: &str = "qr-preview";
pub const OPTIONS_ID: &str = "qr-options";
pub const PREVIEW_CARD_ID: &str = "qr-preview-card";
pub const COPY_ID: &str = "copy-img";
pub const TOOLTIP_ID: &str = "qr-tooltip";
pub const BANNER_ID: &str = "qr-init-banner";

/// Class marking option buttons.
pub const BUTTON_CLASS: &str = "qr-btn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Form,
    Input,
    Container,
    Button,
    Anchor,
    Tooltip,
    Banner,
    WorkArea,
}

/// What an element currently displays.
#[derive(Debug, Clone, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Error(String),
    Preview(PreviewHandle),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        match self {
            Content::Preview(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Content::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    pub parent: Option<String>,
    pub visible: bool,
    pub content: Content,
    pub classes: Vec<String>,
    /// `value` of an input element.
    pub value: String,
    /// `data-format` of an option button.
    pub format: Option<String>,
    /// Anchor target.
    pub href: Option<String>,
    /// Suggested download filename of an anchor.
    pub download: Option<String>,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: None,
            visible: true,
            content: Content::Empty,
            classes: Vec::new(),
            value: String::new(),
            format: None,
            href: None,
            download: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// An id-addressed tree of elements.
#[derive(Debug, Default)]
pub struct Document {
    elements: HashMap<String, Element>,
    next_anon: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page the widget is designed for: every required hook plus PNG/JPG buttons.
    pub fn host_page() -> Self {
        let mut doc = Self::new();
        doc.insert(Element::new(FORM_ID, ElementKind::Form));
        doc.insert(Element::new(INPUT_ID, ElementKind::Input).with_parent(FORM_ID));
        doc.insert(Element::new(PREVIEW_CARD_ID, ElementKind::Container));
        doc.insert(Element::new(PREVIEW_ID, ElementKind::Container).with_parent(PREVIEW_CARD_ID));
        doc.insert(Element::new(OPTIONS_ID, ElementKind::Container));
        doc.insert(
            Element::new("download-png", ElementKind::Button)
                .with_parent(OPTIONS_ID)
                .with_class(BUTTON_CLASS)
                .with_format("png")
                .with_content(Content::Text("PNG".to_string())),
        );
        doc.insert(
            Element::new("download-jpg", ElementKind::Button)
                .with_parent(OPTIONS_ID)
                .with_class(BUTTON_CLASS)
                .with_format("jpg")
                .with_content(Content::Text("JPG".to_string())),
        );
        doc.insert(
            Element::new(COPY_ID, ElementKind::Button)
                .with_parent(OPTIONS_ID)
                .with_content(Content::Text("Copy".to_string())),
        );
        doc
    }

    /// Inserts or replaces an element, returning its id.
    pub fn insert(&mut self, element: Element) -> String {
        let id = element.id.clone();
        self.elements.insert(id.clone(), element);
        id
    }

    /// Returns a fresh id with the given prefix, unused in this document.
    pub fn unique_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_anon += 1;
            let id = format!("{}-{}", prefix, self.next_anon);
            if !self.elements.contains_key(&id) {
                return id;
            }
        }
    }

    /// Removes an element and everything below it.
    pub fn remove(&mut self, id: &str) -> Option<Element> {
        let removed = self.elements.remove(id)?;
        let children: Vec<String> = self.children(id).map(|e| e.id.clone()).collect();
        for child in children {
            self.remove(&child);
        }
        Some(removed)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .values()
            .filter(move |e| e.parent.as_deref() == Some(id))
    }

    pub fn elements_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values().filter(move |e| e.kind == kind)
    }

    /// Moves `id` under `parent`. Does nothing if either is missing.
    pub fn append_child(&mut self, parent: &str, id: &str) {
        if !self.contains(parent) {
            return;
        }
        if let Some(element) = self.elements.get_mut(id) {
            element.parent = Some(parent.to_string());
        }
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(element) = self.elements.get_mut(id) {
            element.visible = visible;
        }
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.get(id).is_some_and(|e| e.visible)
    }

    pub fn set_content(&mut self, id: &str, content: Content) {
        if let Some(element) = self.elements.get_mut(id) {
            element.content = content;
        }
    }

    pub fn content(&self, id: &str) -> Option<&Content> {
        self.get(id).map(|e| &e.content)
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.get(id).map(|e| e.value.as_str())
    }

    pub fn set_value(&mut self, id: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.value = value.to_string();
        }
    }

    /// Walks from `id` up through its ancestors and returns the first element matching `pred`.
    pub fn closest(&self, id: &str, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        let mut current = self.get(id);
        while let Some(element) = current {
            if pred(element) {
                return Some(element);
            }
            current = element.parent.as_deref().and_then(|p| self.get(p));
        }
        None
    }

    /// True if `id` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, id: &str, ancestor: &str) -> bool {
        self.closest(id, |e| e.id == ancestor).is_some()
    }
}
