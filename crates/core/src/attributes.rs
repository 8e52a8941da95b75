//! Attribute serialization and element classification.

use crate::error::RenderError;
use crate::escape::push_attribute;
use crate::node::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

/// HTML elements that never have children or a closing tag.
pub const DEFAULT_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// The closed set of void element tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoidElements(BTreeSet<String>);

impl VoidElements {
    /// Creates a set from tag names.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Returns true if `tag` is void.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Number of void tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no tag is void.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VoidElements {
    fn default() -> Self {
        Self::new(DEFAULT_VOID_ELEMENTS.iter().copied())
    }
}

/// Maps a node's property name to the attribute name written to markup.
///
/// Returning `None` omits the property from the output entirely.
pub trait AttributeNameMapper: Send + Sync {
    /// Maps one property name.
    fn map_property<'a>(&self, property: &'a str) -> Option<Cow<'a, str>>;
}

/// Writes property names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl AttributeNameMapper for IdentityMapper {
    fn map_property<'a>(&self, property: &'a str) -> Option<Cow<'a, str>> {
        Some(Cow::Borrowed(property))
    }
}

/// Maps the common camelCase DOM property names to their HTML attribute names
/// and drops framework-only props.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPropertyMapper;

impl AttributeNameMapper for HtmlPropertyMapper {
    fn map_property<'a>(&self, property: &'a str) -> Option<Cow<'a, str>> {
        let mapped = match property {
            "children" | "key" | "ref" => return None,
            "className" => "class",
            "htmlFor" => "for",
            "httpEquiv" => "http-equiv",
            "acceptCharset" => "accept-charset",
            _ => return Some(Cow::Borrowed(property)),
        };
        Some(Cow::Borrowed(mapped))
    }
}

impl<F> AttributeNameMapper for F
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    fn map_property<'a>(&self, property: &'a str) -> Option<Cow<'a, str>> {
        self(property)
    }
}

/// Returns true if `name` may appear as an attribute name.
///
/// Accepts `[A-Za-z_:][A-Za-z0-9_:.-]*`.
pub fn is_valid_attribute_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b':' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-'))
}

/// Returns true if `tag` may appear as an element name.
///
/// Accepts an ASCII letter followed by `[A-Za-z0-9_:.-]*`, which covers
/// lowercase HTML tags, custom elements (`my-widget`) and namespaced tags.
pub fn is_valid_tag_name(tag: &str) -> bool {
    let mut bytes = tag.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-'))
}

/// Serializes element attributes through a name mapper.
#[derive(Clone)]
pub struct AttributeSerializer {
    mapper: Arc<dyn AttributeNameMapper>,
}

impl std::fmt::Debug for AttributeSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeSerializer").finish_non_exhaustive()
    }
}

impl Default for AttributeSerializer {
    fn default() -> Self {
        Self::new(HtmlPropertyMapper)
    }
}

impl AttributeSerializer {
    /// Creates a serializer with the given name mapper.
    pub fn new(mapper: impl AttributeNameMapper + 'static) -> Self {
        Self {
            mapper: Arc::new(mapper),
        }
    }

    /// Creates a serializer sharing an existing mapper.
    pub fn from_shared(mapper: Arc<dyn AttributeNameMapper>) -> Self {
        Self { mapper }
    }

    /// Serializes `attributes` to a string, each entry with a leading space.
    ///
    /// ```
    /// use xssr_core::{AttributeSerializer, VirtualNode};
    ///
    /// let input = VirtualNode::element("input")
    ///     .attr("className", "field")
    ///     .attr("disabled", true)
    ///     .attr("hidden", false);
    /// let VirtualNode::Element { attributes, .. } = &input else {
    ///     unreachable!()
    /// };
    /// let out = AttributeSerializer::default()
    ///     .serialize_attributes("input", attributes)
    ///     .unwrap();
    /// assert_eq!(out, r#" class="field" disabled"#);
    /// ```
    pub fn serialize_attributes(
        &self,
        tag: &str,
        attributes: &Attributes,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        self.write_attributes(tag, attributes, &mut out)?;
        Ok(out)
    }

    /// Appends serialized `attributes` to `out`.
    ///
    /// On error `out` may hold a partial attribute list; callers serialize
    /// into a scratch buffer and discard it.
    pub fn write_attributes(
        &self,
        tag: &str,
        attributes: &Attributes,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for (property, value) in attributes {
            let Some(name) = self.mapper.map_property(property) else {
                continue;
            };
            if !is_valid_attribute_name(&name) {
                return Err(RenderError::invalid_name(tag, name));
            }
            match value {
                AttributeValue::Text(text) => {
                    out.push(' ');
                    out.push_str(&name);
                    out.push_str("=\"");
                    push_attribute(text, out);
                    out.push('"');
                }
                AttributeValue::Number(number) => {
                    if !number.is_finite() {
                        return Err(RenderError::invalid_value(
                            tag,
                            name,
                            format!("{} is not a finite number", number),
                        ));
                    }
                    out.push(' ');
                    out.push_str(&name);
                    out.push_str("=\"");
                    push_number(*number, out);
                    out.push('"');
                }
                AttributeValue::Bool(true) => {
                    out.push(' ');
                    out.push_str(&name);
                }
                AttributeValue::Bool(false) | AttributeValue::Absent => {}
            }
        }
        Ok(())
    }

    /// Returns the mapped name of `property`, or `None` if it is omitted.
    pub fn map_name<'a>(&self, property: &'a str) -> Option<Cow<'a, str>> {
        self.mapper.map_property(property)
    }
}

fn push_number(number: f64, out: &mut String) {
    // `-0` would otherwise print with its sign.
    if number == 0.0 {
        out.push('0');
    } else {
        out.push_str(&number.to_string());
    }
}
