#![deny(missing_docs)]
//! xssr core: the virtual document model, markup escaping, attribute
//! serialization, render options and error types.

/// Attribute serialization and element classification.
pub mod attributes;
/// Core error and diagnostic types.
pub mod error;
/// Markup escaping helpers.
pub mod escape;
/// Virtual document tree types.
pub mod node;
/// Render configuration.
pub mod options;

pub use attributes::{
    AttributeNameMapper, AttributeSerializer, DEFAULT_VOID_ELEMENTS, HtmlPropertyMapper,
    IdentityMapper, VoidElements, is_valid_attribute_name, is_valid_tag_name,
};
pub use error::{CollaboratorError, NodePath, RenderDiagnostics, RenderError, RenderWarning};
pub use escape::{escape_attribute, escape_text};
pub use node::{AttributeValue, Attributes, ComponentRef, PropValue, Props, VirtualNode};
pub use options::RenderOptions;
