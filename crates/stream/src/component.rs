//! The component-render collaborator and the context it receives.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use xssr_core::{CollaboratorError, ComponentRef, PropValue, Props, VirtualNode};

/// Expands component nodes into subtrees.
///
/// Called synchronously from the walker, at most once per component node per
/// render. Implementations must not depend on being called for nodes the
/// render never reaches (a failed or aborted render stops early).
pub trait ComponentRenderer: Send + Sync {
    /// Renders `component` with `props` under the inherited `context`.
    fn render(
        &self,
        component: &ComponentRef,
        props: &Props,
        context: &RenderContext,
    ) -> Result<Rendered, CollaboratorError>;
}

/// Output of one component render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    /// The subtree replacing the component node.
    pub node: VirtualNode,
    /// Context values made visible to everything inside `node`.
    pub provide: Props,
}

impl Rendered {
    /// Wraps a subtree without providing context.
    pub fn new(node: VirtualNode) -> Self {
        Self {
            node,
            provide: Props::new(),
        }
    }

    /// Provides a context value to the subtree.
    pub fn provide(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.provide.insert(key.into(), value.into());
        self
    }
}

impl From<VirtualNode> for Rendered {
    fn from(node: VirtualNode) -> Self {
        Self::new(node)
    }
}

#[derive(Debug)]
struct Scope {
    values: Props,
    parent: Option<Arc<Scope>>,
}

/// Context values inherited from enclosing components.
///
/// Scopes are shared, so handing a context to every child frame is a
/// reference-count bump.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    scope: Option<Arc<Scope>>,
}

impl RenderContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root context holding `values`.
    pub fn from_values(values: Props) -> Self {
        Self::new().with_values(values)
    }

    /// Returns a child context where `values` shadow this one.
    pub fn with_values(&self, values: Props) -> Self {
        if values.is_empty() {
            return self.clone();
        }
        Self {
            scope: Some(Arc::new(Scope {
                values,
                parent: self.scope.clone(),
            })),
        }
    }

    /// Looks up `key`, innermost scope first.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        let mut scope = self.scope.as_deref();
        while let Some(current) = scope {
            if let Some(value) = current.values.get(key) {
                return Some(value);
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Returns true if no scope provides any value.
    pub fn is_empty(&self) -> bool {
        self.scope.is_none()
    }
}

/// Adapter turning a closure into a [`ComponentRenderer`].
///
/// ```
/// use xssr_stream::{Rendered, VirtualNode, render_fn};
///
/// let components = render_fn(|component, _props, _context| {
///     Ok(Rendered::new(VirtualNode::text(component.name())))
/// });
/// # let _ = components;
/// ```
pub fn render_fn<F>(f: F) -> FnRenderer<F>
where
    F: Fn(&ComponentRef, &Props, &RenderContext) -> Result<Rendered, CollaboratorError>
        + Send
        + Sync,
{
    FnRenderer(f)
}

/// A [`ComponentRenderer`] backed by a closure. See [`render_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnRenderer<F>(F);

impl<F> ComponentRenderer for FnRenderer<F>
where
    F: Fn(&ComponentRef, &Props, &RenderContext) -> Result<Rendered, CollaboratorError>
        + Send
        + Sync,
{
    fn render(
        &self,
        component: &ComponentRef,
        props: &Props,
        context: &RenderContext,
    ) -> Result<Rendered, CollaboratorError> {
        (self.0)(component, props, context)
    }
}

type ComponentFn =
    Box<dyn Fn(&Props, &RenderContext) -> Result<Rendered, CollaboratorError> + Send + Sync>;

/// Name-keyed component render functions.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, ComponentFn>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.components.keys().collect();
        names.sort();
        f.debug_struct("ComponentRegistry")
            .field("components", &names)
            .finish()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the render function for `name`, replacing any previous one.
    pub fn register<F>(mut self, name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Props, &RenderContext) -> Result<Rendered, CollaboratorError>
            + Send
            + Sync
            + 'static,
    {
        self.components.insert(name.into(), Box::new(render));
        self
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }
}

impl ComponentRenderer for ComponentRegistry {
    fn render(
        &self,
        component: &ComponentRef,
        props: &Props,
        context: &RenderContext,
    ) -> Result<Rendered, CollaboratorError> {
        let Some(render) = self.components.get(component.name()) else {
            return Err(CollaboratorError::new(
                component.name(),
                "no component registered under this name",
            ));
        };
        render(props, context)
    }
}

/// Rejects every component. Used when a tree is expected to be fully resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComponents;

impl ComponentRenderer for NoComponents {
    fn render(
        &self,
        component: &ComponentRef,
        _props: &Props,
        _context: &RenderContext,
    ) -> Result<Rendered, CollaboratorError> {
        Err(CollaboratorError::new(
            component.name(),
            "no component renderer configured",
        ))
    }
}

impl<T: ComponentRenderer + ?Sized> ComponentRenderer for Arc<T> {
    fn render(
        &self,
        component: &ComponentRef,
        props: &Props,
        context: &RenderContext,
    ) -> Result<Rendered, CollaboratorError> {
        (**self).render(component, props, context)
    }
}

/// Builds a prop map from pairs.
pub fn props<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Props
where
    K: Into<String>,
    V: Into<PropValue>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect::<IndexMap<_, _>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_lookup_prefers_inner_scope() {
        let root = RenderContext::from_values(props([("theme", "dark"), ("lang", "en")]));
        let inner = root.with_values(props([("theme", "light")]));

        assert_eq!(inner.get("theme").and_then(PropValue::as_str), Some("light"));
        assert_eq!(inner.get("lang").and_then(PropValue::as_str), Some("en"));
        assert_eq!(root.get("theme").and_then(PropValue::as_str), Some("dark"));
        assert!(inner.get("missing").is_none());
    }

    #[test]
    fn empty_values_reuse_scope() {
        let root = RenderContext::new();
        assert!(root.is_empty());
        assert!(root.with_values(Props::new()).is_empty());
    }

    #[test]
    fn registry_dispatches_by_name() {
        let registry = ComponentRegistry::new().register("Greeting", |props, _| {
            let name = props.get("name").and_then(PropValue::as_str).unwrap_or("you");
            Ok(VirtualNode::text(format!("Hello, {name}")).into())
        });
        assert!(registry.contains("Greeting"));

        let rendered = registry
            .render(
                &ComponentRef::new("Greeting"),
                &props([("name", "Ada")]),
                &RenderContext::new(),
            )
            .unwrap();
        assert_eq!(rendered.node, VirtualNode::text("Hello, Ada"));

        let err = registry
            .render(&ComponentRef::new("Missing"), &Props::new(), &RenderContext::new())
            .unwrap_err();
        assert_eq!(err.component, "Missing");
    }

    #[test]
    fn no_components_rejects() {
        let err = NoComponents
            .render(&ComponentRef::new("X"), &Props::new(), &RenderContext::new())
            .unwrap_err();
        assert_eq!(err.component, "X");
    }
}
