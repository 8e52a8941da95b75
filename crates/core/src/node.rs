//! Virtual document tree types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Element attributes in insertion order.
pub type Attributes = IndexMap<String, AttributeValue>;

/// Component props in insertion order.
pub type Props = IndexMap<String, PropValue>;

/// A node of the virtual document tree.
///
/// Serialized with a `type` tag:
///
/// ```
/// use xssr_core::VirtualNode;
///
/// let node: VirtualNode = serde_json::from_str(
///     r#"{"type":"element","tag":"p","children":[{"type":"text","content":"hi"}]}"#,
/// )
/// .unwrap();
/// assert_eq!(node, VirtualNode::element("p").child(VirtualNode::text("hi")));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VirtualNode {
    /// Text content, escaped on output.
    Text {
        /// Raw (unescaped) text.
        content: String,
    },
    /// A markup element.
    Element {
        /// Tag name.
        tag: String,
        /// Attributes in output order.
        #[serde(default)]
        attributes: Attributes,
        /// Child nodes.
        #[serde(default)]
        children: Vec<VirtualNode>,
    },
    /// An unresolved component, expanded through the component renderer.
    Component {
        /// Which component to render.
        component: ComponentRef,
        /// Input properties.
        #[serde(default)]
        props: Props,
    },
    /// Children without wrapping markup.
    Fragment {
        /// Child nodes.
        #[serde(default)]
        children: Vec<VirtualNode>,
    },
    /// Renders nothing.
    #[default]
    Empty,
}

impl VirtualNode {
    /// Creates a text node.
    pub fn text(content: impl Into<String>) -> Self {
        VirtualNode::Text {
            content: content.into(),
        }
    }

    /// Creates an element with no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        VirtualNode::Element {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Creates a component node with no props.
    pub fn component(component: impl Into<ComponentRef>) -> Self {
        VirtualNode::Component {
            component: component.into(),
            props: Props::new(),
        }
    }

    /// Creates a fragment.
    pub fn fragment(children: impl IntoIterator<Item = VirtualNode>) -> Self {
        VirtualNode::Fragment {
            children: children.into_iter().collect(),
        }
    }

    /// Creates an empty node.
    pub fn empty() -> Self {
        VirtualNode::Empty
    }

    /// Sets an attribute on an element. No-op for other node kinds.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        if let VirtualNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Sets a prop on a component. No-op for other node kinds.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        if let VirtualNode::Component { ref mut props, .. } = self {
            props.insert(name.into(), value.into());
        }
        self
    }

    /// Appends a child to an element or fragment. No-op for other node kinds.
    pub fn child(mut self, child: VirtualNode) -> Self {
        if let Some(children) = self.children_mut() {
            children.push(child);
        }
        self
    }

    /// Appends children to an element or fragment. No-op for other node kinds.
    pub fn children(mut self, new_children: impl IntoIterator<Item = VirtualNode>) -> Self {
        if let Some(children) = self.children_mut() {
            children.extend(new_children);
        }
        self
    }

    /// Child list of an element or fragment.
    pub fn child_nodes(&self) -> &[VirtualNode] {
        match self {
            VirtualNode::Element { children, .. } | VirtualNode::Fragment { children } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<VirtualNode>> {
        match self {
            VirtualNode::Element { children, .. } | VirtualNode::Fragment { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Short kind name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VirtualNode::Text { .. } => "text",
            VirtualNode::Element { .. } => "element",
            VirtualNode::Component { .. } => "component",
            VirtualNode::Fragment { .. } => "fragment",
            VirtualNode::Empty => "empty",
        }
    }
}

// The derived drop glue would recurse once per nesting level, which overflows
// the thread stack on deep trees. Detached descendants are freed from a worklist.
impl Drop for VirtualNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_descendants(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_descendants(&mut node, &mut pending);
        }
    }
}

fn detach_descendants(node: &mut VirtualNode, pending: &mut Vec<VirtualNode>) {
    match node {
        VirtualNode::Element { children, .. } | VirtualNode::Fragment { children } => {
            pending.append(children);
        }
        VirtualNode::Component { props, .. } => {
            for value in props.values_mut() {
                if let PropValue::Node(inner) = value {
                    pending.push(std::mem::take(inner.as_mut()));
                }
            }
        }
        VirtualNode::Text { .. } | VirtualNode::Empty => {}
    }
}

impl From<&str> for VirtualNode {
    fn from(content: &str) -> Self {
        VirtualNode::text(content)
    }
}

impl From<String> for VirtualNode {
    fn from(content: String) -> Self {
        VirtualNode::text(content)
    }
}

impl<T: Into<VirtualNode>> From<Option<T>> for VirtualNode {
    fn from(node: Option<T>) -> Self {
        node.map_or(VirtualNode::Empty, Into::into)
    }
}

/// Opaque reference to a component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(String);

impl ComponentRef {
    /// Creates a reference from a component name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The component name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ComponentRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An element attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// `true` renders the bare name, `false` omits the attribute.
    Bool(bool),
    /// Rendered as decimal text.
    Number(f64),
    /// Rendered double-quoted and escaped.
    Text(String),
    /// Omitted.
    #[default]
    Absent,
}

impl AttributeValue {
    /// Returns true if the value produces output; `false` and absent are omitted.
    pub fn is_written(&self) -> bool {
        match self {
            AttributeValue::Bool(value) => *value,
            AttributeValue::Number(_) | AttributeValue::Text(_) => true,
            AttributeValue::Absent => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(f64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Number(f64::from(value))
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Absent, Into::into)
    }
}

/// A component prop value. Opaque to the serializer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// No value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Ordered list of values.
    List(Vec<PropValue>),
    /// A subtree handed to the component (e.g. its children).
    Node(Box<VirtualNode>),
    /// Nested key/value map.
    Map(IndexMap<String, PropValue>),
}

impl PropValue {
    /// Returns the text value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the flag, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the subtree, if this is a node.
    pub fn as_node(&self) -> Option<&VirtualNode> {
        match self {
            PropValue::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<VirtualNode> for PropValue {
    fn from(node: VirtualNode) -> Self {
        PropValue::Node(Box::new(node))
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(values: Vec<PropValue>) -> Self {
        PropValue::List(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let node = VirtualNode::element("div")
            .attr("id", "a")
            .attr("hidden", true)
            .child(VirtualNode::text("x"))
            .children([VirtualNode::element("br"), VirtualNode::empty()]);

        let VirtualNode::Element {
            tag,
            attributes,
            children,
        } = &node
        else {
            panic!("expected element");
        };
        assert_eq!(tag, "div");
        assert_eq!(
            attributes.keys().collect::<Vec<_>>(),
            vec!["id", "hidden"],
            "attributes keep insertion order"
        );
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn deep_trees_drop_without_recursion() {
        let mut node = VirtualNode::text("leaf");
        for depth in 0..200_000 {
            node = if depth % 2 == 0 {
                VirtualNode::element("div").child(node)
            } else {
                VirtualNode::component("Wrap").prop("children", VirtualNode::fragment([node]))
            };
        }
        drop(node);
    }

    #[test]
    fn only_rendered_values_are_written() {
        assert!(AttributeValue::Bool(true).is_written());
        assert!(AttributeValue::Number(0.0).is_written());
        assert!(AttributeValue::Text(String::new()).is_written());
        assert!(!AttributeValue::Bool(false).is_written());
        assert!(!AttributeValue::Absent.is_written());
    }

    #[test]
    fn attr_on_text_is_noop() {
        let node = VirtualNode::text("x").attr("id", "a").child(VirtualNode::empty());
        assert_eq!(node, VirtualNode::text("x"));
    }

    #[test]
    fn deserializes_tree_from_json() {
        let json = r#"{
            "type": "fragment",
            "children": [
                {"type": "element", "tag": "input", "attributes": {"disabled": true, "size": 3, "name": "q", "value": null}},
                {"type": "component", "component": "Card", "props": {"title": "Hi", "children": {"type": "text", "content": "body"}}},
                {"type": "empty"}
            ]
        }"#;
        let node: VirtualNode = serde_json::from_str(json).unwrap();

        let children = node.child_nodes();
        assert_eq!(children.len(), 3);

        let VirtualNode::Element { attributes, .. } = &children[0] else {
            panic!("expected element");
        };
        assert_eq!(attributes["disabled"], AttributeValue::Bool(true));
        assert_eq!(attributes["size"], AttributeValue::Number(3.0));
        assert_eq!(attributes["name"], AttributeValue::Text("q".into()));
        assert_eq!(attributes["value"], AttributeValue::Absent);

        let VirtualNode::Component { component, props } = &children[1] else {
            panic!("expected component");
        };
        assert_eq!(component.name(), "Card");
        assert_eq!(props["title"].as_str(), Some("Hi"));
        assert_eq!(props["children"].as_node(), Some(&VirtualNode::text("body")));

        assert_eq!(children[2], VirtualNode::Empty);
    }

    #[test]
    fn option_maps_to_empty_and_absent() {
        assert_eq!(VirtualNode::from(None::<&str>), VirtualNode::Empty);
        assert_eq!(AttributeValue::from(None::<bool>), AttributeValue::Absent);
        assert_eq!(AttributeValue::from(Some(2_i32)), AttributeValue::Number(2.0));
    }
}
