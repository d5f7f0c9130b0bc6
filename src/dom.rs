// Seam between the engine and the host page. A browser binding implements
// these traits over real DOM handles; tests use the in-memory `fake` module.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
        }
    }
}

/// Which property carries an element's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    /// `textarea` / `input`: the `value` property
    #[default]
    Value,
    /// contenteditable and friends: the text content
    Text,
}

pub trait Element {
    fn bounding_size(&self) -> Size;
    fn computed_style(&self) -> ComputedStyle;
    fn is_disabled(&self) -> bool;
    fn is_read_only(&self) -> bool;
    fn content_kind(&self) -> ContentKind;
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
    fn text_content(&self) -> String;
    fn set_text_content(&self, text: &str);
    /// Fire a bubbling event of this name
    fn dispatch_event(&self, event: &str);
    fn focus(&self);
}

pub trait Document {
    type Element: Element;

    /// Full address of the page
    fn location(&self) -> String;
    /// Visible text of the page body
    fn body_text(&self) -> String;
    /// Matches in document order
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element>;
}

// ============ Input Handle ============

/// A located input, with its content property fixed at discovery time
#[derive(Debug, Clone)]
pub enum InputHandle<E> {
    ValueBearing(E),
    TextBearing(E),
}

impl<E: Element> InputHandle<E> {
    pub fn from_element(element: E) -> Self {
        match element.content_kind() {
            ContentKind::Value => InputHandle::ValueBearing(element),
            ContentKind::Text => InputHandle::TextBearing(element),
        }
    }

    pub fn element(&self) -> &E {
        match self {
            InputHandle::ValueBearing(e) | InputHandle::TextBearing(e) => e,
        }
    }

    pub fn read(&self) -> String {
        match self {
            InputHandle::ValueBearing(e) => e.value(),
            InputHandle::TextBearing(e) => e.text_content(),
        }
    }

    pub fn write(&self, content: &str) {
        match self {
            InputHandle::ValueBearing(e) => e.set_value(content),
            InputHandle::TextBearing(e) => e.set_text_content(content),
        }
    }
}
