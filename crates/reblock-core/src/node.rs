//! Component tree input and rendered output
//!
//! A [`Node`] tree is built fresh for every render and never persisted. The
//! engine expands component invocations depth-first and produces a tree of
//! [`RenderedNode`]s containing only elements.

use crate::context::{Dispatch, Scope};
use crate::error::Result;
use crate::identity::ComponentKey;
use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Body of a component: props in, declarative subtree out
pub type RenderFn = Rc<dyn Fn(&Value, &mut Scope<'_>) -> Result<Node>>;

/// Handler invoked when an element is pressed
pub type PressHandler = Rc<dyn Fn(&mut Dispatch<'_>) -> Result<()>>;

/// A node of the declarative component tree
#[derive(Clone)]
pub enum Node {
    /// Declarative leaf element (text, stack, button, ...)
    Element(Element),
    /// Component invocation
    Component(Component),
    /// Renders nothing but still occupies its position among siblings
    Empty,
}

impl Node {
    pub fn empty() -> Self {
        Node::Empty
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Component> for Node {
    fn from(component: Component) -> Self {
        Node::Component(component)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map(Into::into).unwrap_or(Node::Empty)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(element) => fmt::Debug::fmt(element, f),
            Node::Component(component) => fmt::Debug::fmt(component, f),
            Node::Empty => write!(f, "Empty"),
        }
    }
}

/// A declarative element the engine walks but does not interpret
#[derive(Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) key: Option<String>,
    pub(crate) props: ValueMap,
    pub(crate) children: Vec<Node>,
    pub(crate) on_press: Option<PressHandler>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key: None,
            props: ValueMap::new(),
            children: Vec::new(),
            on_press: None,
        }
    }

    /// Give the element an explicit key among its siblings
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Make the element interactive
    pub fn on_press(mut self, handler: impl Fn(&mut Dispatch<'_>) -> Result<()> + 'static) -> Self {
        self.on_press = Some(Rc::new(handler));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("interactive", &self.on_press.is_some())
            .finish()
    }
}

/// A component invocation: a render function plus its props
#[derive(Clone)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) key: Option<String>,
    pub(crate) props: Value,
    pub(crate) render: RenderFn,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Value, &mut Scope<'_>) -> Result<Node> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            key: None,
            props: Value::Null,
            render: Rc::new(render),
        }
    }

    /// Build an invocation from a shared render function
    pub fn from_fn(name: impl Into<String>, render: RenderFn) -> Self {
        Self {
            name: name.into(),
            key: None,
            props: Value::Null,
            render,
        }
    }

    pub fn props(mut self, props: impl Into<Value>) -> Self {
        self.props = props.into();
        self
    }

    /// Give the invocation an explicit key among its siblings
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

/// Protocol-ready output element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedNode {
    pub tag: String,
    pub key: ComponentKey,
    #[serde(default)]
    pub props: ValueMap,
    /// Key the host sends back in `Event::Press` when the element is pressed
    #[serde(default)]
    pub action: Option<ComponentKey>,
    #[serde(default)]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    /// Depth-first search for the first node matching `predicate`
    pub fn find(&self, predicate: &dyn Fn(&RenderedNode) -> bool) -> Option<&RenderedNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    /// Find the first node whose `id` prop equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<&RenderedNode> {
        self.find(&|node| node.props.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Get a string prop
    pub fn text(&self, prop: &str) -> Option<&str> {
        self.props.get(prop).and_then(Value::as_str)
    }

    /// Count nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderedNode::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_builder() {
        let element = Element::new("vstack")
            .key("list")
            .prop("gap", "small")
            .child(Element::new("text").prop("text", "hi"))
            .children(vec![Node::empty(), Element::new("spacer").into()]);

        assert_eq!(element.tag(), "vstack");
        assert_eq!(element.children.len(), 3);
        assert!(element.children[1].is_empty());
        assert!(element.on_press.is_none());
    }

    #[test]
    fn test_optional_child() {
        let none: Option<Element> = None;
        assert!(Node::from(none).is_empty());
    }

    #[test]
    fn test_rendered_find() {
        let tree = RenderedNode {
            tag: "vstack".into(),
            key: ComponentKey::new("0.App/0.vstack"),
            props: ValueMap::new(),
            action: None,
            children: vec![RenderedNode {
                tag: "text".into(),
                key: ComponentKey::new("0.App/0.vstack/0.text"),
                props: [
                    ("id".to_string(), Value::from("label")),
                    ("text".to_string(), Value::from("Count: 1")),
                ]
                .into_iter()
                .collect(),
                action: None,
                children: vec![],
            }],
        };

        assert_eq!(tree.count(), 2);
        assert_eq!(
            tree.find_by_id("label").and_then(|n| n.text("text")),
            Some("Count: 1")
        );
        assert!(tree.find_by_id("missing").is_none());
    }
}
