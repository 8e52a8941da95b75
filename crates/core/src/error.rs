use std::time::Duration;
use thiserror::Error;

/// Location of a node inside the rendered tree.
///
/// Each entry is the index of the child taken at that depth, starting from the
/// root. The root itself has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path of the root node.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from child indices.
    pub fn from_indices(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    /// Child indices from the root.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of element/fragment boundaries crossed to reach the node.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Failure reported by the component-render collaborator.
#[derive(Debug, Error)]
#[error("component `{component}` failed to render: {message}")]
pub struct CollaboratorError {
    /// Name of the component whose render failed.
    pub component: String,
    /// Human readable failure description.
    pub message: String,
    /// Underlying cause, if the collaborator had one.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    /// Creates a collaborator error without an underlying cause.
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Terminal errors of a render session.
///
/// Every variant aborts the session it occurs in. Output already delivered to
/// the consumer stays delivered.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A component kept expanding into further components past the configured bound.
    #[error("expansion depth limit of {limit} exceeded by component `{component}` at {path}")]
    ExpansionDepthExceeded {
        /// Component being expanded when the limit was hit.
        component: String,
        /// Configured maximum.
        limit: u32,
        /// Location of the component node.
        path: NodePath,
    },
    /// An attribute value that cannot be serialized.
    #[error("invalid value for attribute `{name}` on <{tag}> at {path}: {reason}")]
    InvalidAttributeValue {
        /// Element tag.
        tag: String,
        /// Attribute name.
        name: String,
        /// Why the value was rejected.
        reason: String,
        /// Location of the element.
        path: NodePath,
    },
    /// An attribute name outside the allowed identifier pattern.
    #[error("invalid attribute name `{name}` on <{tag}> at {path}")]
    InvalidAttributeName {
        /// Element tag.
        tag: String,
        /// Offending (mapped) attribute name.
        name: String,
        /// Location of the element.
        path: NodePath,
    },
    /// An element tag that is empty or contains characters markup cannot carry.
    #[error("invalid tag name `{tag}` at {path}")]
    InvalidTagName {
        /// Offending tag.
        tag: String,
        /// Location of the element.
        path: NodePath,
    },
    /// The component-render collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    /// The consumer kept the channel paused for longer than allowed.
    #[error("consumer did not resume within {limit:?}")]
    BackpressureTimeout {
        /// Configured ceiling.
        limit: Duration,
    },
    /// IO error while writing chunks to a writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Create an invalid attribute value error.
    pub fn invalid_value(
        tag: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttributeValue {
            tag: tag.into(),
            name: name.into(),
            reason: reason.into(),
            path: NodePath::root(),
        }
    }

    /// Create an invalid attribute name error.
    pub fn invalid_name(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidAttributeName {
            tag: tag.into(),
            name: name.into(),
            path: NodePath::root(),
        }
    }

    /// Create an invalid tag name error.
    pub fn invalid_tag(tag: impl Into<String>) -> Self {
        Self::InvalidTagName {
            tag: tag.into(),
            path: NodePath::root(),
        }
    }

    /// Returns the node location, for the kinds that carry one.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::ExpansionDepthExceeded { path, .. }
            | Self::InvalidAttributeValue { path, .. }
            | Self::InvalidAttributeName { path, .. }
            | Self::InvalidTagName { path, .. } => Some(path),
            Self::Collaborator(_) | Self::BackpressureTimeout { .. } | Self::Io(_) => None,
        }
    }

    /// Replaces the node location, for the kinds that carry one.
    ///
    /// Attribute serialization runs without knowledge of the tree, so the
    /// walker fills in the location afterwards.
    pub fn at(mut self, location: NodePath) -> Self {
        match &mut self {
            Self::ExpansionDepthExceeded { path, .. }
            | Self::InvalidAttributeValue { path, .. }
            | Self::InvalidAttributeName { path, .. }
            | Self::InvalidTagName { path, .. } => *path = location,
            Self::Collaborator(_) | Self::BackpressureTimeout { .. } | Self::Io(_) => {}
        }
        self
    }
}

/// Non-fatal findings that don't stop a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// A void element was given children; they were dropped.
    VoidChildrenIgnored {
        /// Void element tag.
        tag: String,
        /// Number of dropped children.
        count: usize,
        /// Location of the element.
        path: NodePath,
    },
    /// The element already carried the identity attribute, so no marker was generated.
    IdentityMarkerSuppressed {
        /// Element tag.
        tag: String,
        /// Location of the element.
        path: NodePath,
    },
}

impl RenderWarning {
    /// Get the location of this warning
    pub fn path(&self) -> &NodePath {
        match self {
            RenderWarning::VoidChildrenIgnored { path, .. } => path,
            RenderWarning::IdentityMarkerSuppressed { path, .. } => path,
        }
    }
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderWarning::VoidChildrenIgnored { tag, count, path } => {
                write!(
                    f,
                    "{}: void element <{}> ignored {} child node(s)",
                    path, tag, count
                )
            }
            RenderWarning::IdentityMarkerSuppressed { tag, path } => {
                write!(f, "{}: <{}> already carries an identity marker", path, tag)
            }
        }
    }
}

/// Collection of render diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RenderDiagnostics {
    /// List of non-fatal warnings
    pub warnings: Vec<RenderWarning>,
}

impl RenderDiagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the diagnostics collection
    pub fn add_warning(&mut self, warning: RenderWarning) {
        self.warnings.push(warning);
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get total count of all diagnostics
    pub fn count(&self) -> usize {
        self.warnings.len()
    }
}
