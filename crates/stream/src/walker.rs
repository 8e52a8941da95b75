//! Explicit-stack tree walker.
//!
//! The walker replaces recursive rendering with a stack of [`TraversalFrame`]s
//! so a render can stop between any two steps and pick up later with nothing
//! but the stack. Each [`Walker::step`] processes exactly one frame and yields
//! at most one complete markup fragment.

use crate::component::{ComponentRenderer, RenderContext};
use crate::frame::{Phase, TraversalFrame};
use std::sync::Arc;
use xssr_core::escape::push_text;
use xssr_core::{
    Attributes, AttributeSerializer, NodePath, RenderDiagnostics, RenderError, RenderOptions,
    RenderWarning, VirtualNode, is_valid_tag_name,
};

/// Emitted between adjacent text nodes when identity markers are on, so the
/// client can tell where one text node ends and the next begins.
pub const TEXT_SEPARATOR: &str = "<!-- -->";

/// Result of one walker step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// The frame produced this fragment.
    Emit(&'a str),
    /// The frame produced no markup (empty nodes, fragments, expansions).
    Silent,
    /// The stack is empty; the document is complete.
    Done,
}

/// Depth-first serializer state for one render.
pub struct Walker {
    stack: Vec<TraversalFrame>,
    components: Arc<dyn ComponentRenderer>,
    attributes: AttributeSerializer,
    options: Arc<RenderOptions>,
    scratch: String,
    next_node_id: u64,
    last_was_text: bool,
    frames_processed: u64,
    diagnostics: RenderDiagnostics,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("depth", &self.stack.len())
            .field("frames_processed", &self.frames_processed)
            .field("next_node_id", &self.next_node_id)
            .finish_non_exhaustive()
    }
}

impl Walker {
    /// Creates a walker positioned before `root`.
    pub fn new(
        root: VirtualNode,
        components: Arc<dyn ComponentRenderer>,
        attributes: AttributeSerializer,
        options: Arc<RenderOptions>,
        context: RenderContext,
    ) -> Self {
        Self {
            stack: vec![TraversalFrame::enter(root, context, 0)],
            components,
            attributes,
            options,
            scratch: String::with_capacity(256),
            next_node_id: 0,
            last_was_text: false,
            frames_processed: 0,
            diagnostics: RenderDiagnostics::new(),
        }
    }

    /// Processes the top frame.
    ///
    /// On error the stack is cleared; the walker is finished.
    pub fn step(&mut self) -> Result<Step<'_>, RenderError> {
        let Some(frame) = self.stack.pop() else {
            return Ok(Step::Done);
        };
        self.frames_processed += 1;
        self.scratch.clear();

        let result = match frame.phase {
            Phase::Enter => self.enter(frame),
            Phase::Children => {
                self.visit_next_child(frame);
                Ok(())
            }
            Phase::Exit => {
                self.exit(frame);
                Ok(())
            }
        };
        if let Err(err) = result {
            self.stack.clear();
            self.scratch.clear();
            return Err(err);
        }

        if self.scratch.is_empty() {
            Ok(Step::Silent)
        } else {
            Ok(Step::Emit(&self.scratch))
        }
    }

    /// Returns true once the root has been closed (or the walk was abandoned).
    pub fn is_finished(&self) -> bool {
        self.stack.is_empty()
    }

    /// Current stack depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Identity markers assigned so far.
    pub fn nodes_numbered(&self) -> u64 {
        self.next_node_id
    }

    /// Options this walk renders with.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Non-fatal findings so far.
    pub fn diagnostics(&self) -> &RenderDiagnostics {
        &self.diagnostics
    }

    /// Drops every pending frame.
    pub fn abandon(&mut self) {
        self.stack.clear();
        self.scratch.clear();
    }

    /// Location of the node whose frame was just popped.
    pub fn current_path(&self) -> NodePath {
        NodePath::from_indices(
            self.stack
                .iter()
                .filter_map(TraversalFrame::last_child_index)
                .collect::<Vec<_>>(),
        )
    }

    fn enter(&mut self, mut frame: TraversalFrame) -> Result<(), RenderError> {
        match &frame.node {
            VirtualNode::Text { content } => {
                if content.is_empty() {
                    return Ok(());
                }
                if self.last_was_text && !self.options.static_mode {
                    self.scratch.push_str(TEXT_SEPARATOR);
                }
                push_text(content, &mut self.scratch);
                self.last_was_text = true;
            }
            VirtualNode::Empty => {}
            VirtualNode::Element {
                tag,
                attributes,
                children,
            } => {
                self.open_element(tag, attributes)?;
                if self.options.void_elements.contains(tag) {
                    if !children.is_empty() {
                        let path = self.current_path();
                        log::warn!(
                            "void element <{}> at {} has {} child node(s); ignoring them",
                            tag,
                            path,
                            children.len()
                        );
                        self.diagnostics
                            .add_warning(RenderWarning::VoidChildrenIgnored {
                                tag: tag.clone(),
                                count: children.len(),
                                path,
                            });
                    }
                    self.scratch.push_str("/>");
                    return Ok(());
                }
                self.scratch.push('>');
                frame.phase = if children.is_empty() {
                    Phase::Exit
                } else {
                    Phase::Children
                };
                self.stack.push(frame);
            }
            VirtualNode::Fragment { children } => {
                if children.is_empty() {
                    return Ok(());
                }
                frame.phase = Phase::Children;
                self.stack.push(frame);
            }
            VirtualNode::Component { component, props } => {
                let limit = self.options.max_expansion_depth;
                if frame.expansions >= limit {
                    return Err(RenderError::ExpansionDepthExceeded {
                        component: component.name().to_string(),
                        limit,
                        path: self.current_path(),
                    });
                }
                log::trace!(
                    "expanding component `{}` (depth {})",
                    component,
                    frame.expansions + 1
                );
                let rendered = self.components.render(component, props, &frame.context)?;
                let context = frame.context.with_values(rendered.provide);
                self.stack.push(TraversalFrame::enter(
                    rendered.node,
                    context,
                    frame.expansions + 1,
                ));
            }
        }
        Ok(())
    }

    fn visit_next_child(&mut self, mut frame: TraversalFrame) {
        match frame.take_next_child() {
            Some(child) => {
                let child = TraversalFrame::enter(child, frame.context.clone(), frame.expansions);
                self.stack.push(frame);
                self.stack.push(child);
            }
            None => self.exit(frame),
        }
    }

    fn exit(&mut self, frame: TraversalFrame) {
        if let VirtualNode::Element { tag, .. } = &frame.node {
            self.scratch.push_str("</");
            self.scratch.push_str(tag);
            self.scratch.push('>');
            self.last_was_text = false;
        }
    }

    fn open_element(&mut self, tag: &str, attributes: &Attributes) -> Result<(), RenderError> {
        if !is_valid_tag_name(tag) {
            return Err(RenderError::invalid_tag(tag).at(self.current_path()));
        }
        self.scratch.push('<');
        self.scratch.push_str(tag);
        if let Err(err) = self
            .attributes
            .write_attributes(tag, attributes, &mut self.scratch)
        {
            return Err(err.at(self.current_path()));
        }

        let options = Arc::clone(&self.options);
        if let Some(marker) = options.identity_marker() {
            let id = self.next_node_id;
            self.next_node_id += 1;
            let explicit = attributes.iter().any(|(property, value)| {
                value.is_written()
                    && self.attributes.map_name(property).as_deref() == Some(marker)
            });
            if explicit {
                let path = self.current_path();
                self.diagnostics
                    .add_warning(RenderWarning::IdentityMarkerSuppressed {
                        tag: tag.to_string(),
                        path,
                    });
            } else {
                self.scratch.push(' ');
                self.scratch.push_str(marker);
                self.scratch.push_str("=\"");
                self.scratch.push_str(&id.to_string());
                self.scratch.push('"');
            }
        }
        self.last_was_text = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{NoComponents, Rendered, render_fn};
    use xssr_core::{AttributeValue, CollaboratorError, PropValue};

    fn walker(root: VirtualNode, options: RenderOptions) -> Walker {
        Walker::new(
            root,
            Arc::new(NoComponents),
            AttributeSerializer::default(),
            Arc::new(options),
            RenderContext::new(),
        )
    }

    fn fragments(walker: &mut Walker) -> Result<Vec<String>, RenderError> {
        let mut out = Vec::new();
        loop {
            match walker.step()? {
                Step::Emit(fragment) => out.push(fragment.to_string()),
                Step::Silent => {}
                Step::Done => return Ok(out),
            }
        }
    }

    #[test]
    fn emits_one_fragment_per_tag_and_text() {
        let root = VirtualNode::element("div")
            .attr("id", "a")
            .child(VirtualNode::text("x"))
            .child(VirtualNode::element("br"));
        let mut walker = walker(root, RenderOptions::static_markup());

        assert_eq!(
            fragments(&mut walker).unwrap(),
            vec![r#"<div id="a">"#, "x", "<br/>", "</div>"]
        );
        assert!(walker.is_finished());
    }

    #[test]
    fn numbers_elements_in_document_order() {
        let root = VirtualNode::element("ul")
            .child(VirtualNode::element("li").child(VirtualNode::text("a")))
            .child(VirtualNode::element("li").child(VirtualNode::text("b")));
        let mut walker = walker(root, RenderOptions::default());

        let html = fragments(&mut walker).unwrap().concat();
        assert_eq!(
            html,
            r#"<ul data-vid="0"><li data-vid="1">a</li><li data-vid="2">b</li></ul>"#
        );
        assert_eq!(walker.nodes_numbered(), 3);
    }

    #[test]
    fn separates_adjacent_text_only_with_markers() {
        let root = VirtualNode::element("p").children([
            VirtualNode::text("a"),
            VirtualNode::fragment([VirtualNode::text("b"), VirtualNode::empty()]),
            VirtualNode::text(""),
            VirtualNode::text("c"),
        ]);

        let mut with_markers = walker(root.clone(), RenderOptions::default());
        assert_eq!(
            fragments(&mut with_markers).unwrap().concat(),
            r#"<p data-vid="0">a<!-- -->b<!-- -->c</p>"#
        );

        let mut static_walker = walker(root, RenderOptions::static_markup());
        assert_eq!(fragments(&mut static_walker).unwrap().concat(), "<p>abc</p>");
    }

    #[test]
    fn explicit_identity_attribute_wins() {
        let root = VirtualNode::element("div")
            .attr("data-vid", "custom")
            .child(VirtualNode::element("span"));
        let mut walker = walker(root, RenderOptions::default());

        assert_eq!(
            fragments(&mut walker).unwrap().concat(),
            r#"<div data-vid="custom"><span data-vid="1"></span></div>"#
        );
        assert!(matches!(
            walker.diagnostics().warnings.as_slice(),
            [RenderWarning::IdentityMarkerSuppressed { tag, .. }] if tag == "div"
        ));
    }

    #[test]
    fn omitted_identity_attribute_keeps_the_marker() {
        for value in [AttributeValue::Bool(false), AttributeValue::Absent] {
            let root = VirtualNode::element("div")
                .attr("data-vid", value)
                .child(VirtualNode::element("span"));
            let mut walker = walker(root, RenderOptions::default());

            assert_eq!(
                fragments(&mut walker).unwrap().concat(),
                r#"<div data-vid="0"><span data-vid="1"></span></div>"#
            );
            assert!(!walker.diagnostics().has_warnings());
        }
    }

    #[test]
    fn void_children_are_ignored_and_reported() {
        let root = VirtualNode::element("div")
            .child(VirtualNode::element("img").child(VirtualNode::text("nope")));
        let mut walker = walker(root, RenderOptions::static_markup());

        assert_eq!(fragments(&mut walker).unwrap().concat(), "<div><img/></div>");
        assert_eq!(
            walker.diagnostics().warnings,
            vec![RenderWarning::VoidChildrenIgnored {
                tag: "img".into(),
                count: 1,
                path: NodePath::from_indices(vec![0]),
            }]
        );
    }

    #[test]
    fn errors_carry_the_node_path() {
        let root = VirtualNode::element("div").children([
            VirtualNode::text("ok"),
            VirtualNode::fragment([
                VirtualNode::empty(),
                VirtualNode::element("span").attr("bad name", "x"),
            ]),
        ]);
        let mut walker = walker(root, RenderOptions::static_markup());

        let err = fragments(&mut walker).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttributeName { .. }));
        assert_eq!(err.path(), Some(&NodePath::from_indices(vec![1, 1])));
        assert!(walker.is_finished(), "a failed walk drops its stack");
    }

    #[test]
    fn rejects_invalid_tags() {
        let mut walker = walker(VirtualNode::element(""), RenderOptions::static_markup());
        let err = fragments(&mut walker).unwrap_err();
        assert!(matches!(err, RenderError::InvalidTagName { ref tag, .. } if tag.is_empty()));
    }

    #[test]
    fn self_expanding_component_hits_depth_limit() {
        let components = render_fn(|component, _, _| {
            Ok(Rendered::new(VirtualNode::component(component.clone())))
        });
        let options = RenderOptions {
            max_expansion_depth: 5,
            ..RenderOptions::static_markup()
        };
        let mut walker = Walker::new(
            VirtualNode::component("Loop"),
            Arc::new(components),
            AttributeSerializer::default(),
            Arc::new(options),
            RenderContext::new(),
        );

        let mut emitted = 0;
        let err = loop {
            match walker.step() {
                Ok(Step::Emit(_)) => emitted += 1,
                Ok(Step::Silent) => {}
                Ok(Step::Done) => panic!("loop should not terminate"),
                Err(err) => break err,
            }
        };
        assert_eq!(emitted, 0);
        assert_eq!(walker.frames_processed(), 6);
        assert!(matches!(
            err,
            RenderError::ExpansionDepthExceeded { ref component, limit: 5, .. }
                if component == "Loop"
        ));
    }

    #[test]
    fn components_see_inherited_context() {
        let components = render_fn(|component, props, context| match component.name() {
            "Theme" => Ok(Rendered::new(
                props
                    .get("children")
                    .and_then(PropValue::as_node)
                    .cloned()
                    .unwrap_or_default(),
            )
            .provide("theme", "dark")),
            "Label" => {
                let theme = context.get("theme").and_then(PropValue::as_str).unwrap_or("none");
                Ok(VirtualNode::element("span").attr("class", theme).into())
            }
            other => Err(CollaboratorError::new(other, "unknown")),
        });
        let root = VirtualNode::element("main").children([
            VirtualNode::component("Theme").prop(
                "children",
                VirtualNode::element("div").child(VirtualNode::component("Label")),
            ),
            VirtualNode::component("Label"),
        ]);
        let mut walker = Walker::new(
            root,
            Arc::new(components),
            AttributeSerializer::default(),
            Arc::new(RenderOptions::static_markup()),
            RenderContext::new(),
        );

        assert_eq!(
            fragments(&mut walker).unwrap().concat(),
            r#"<main><div><span class="dark"></span></div><span class="none"></span></main>"#
        );
    }

    #[test]
    fn collaborator_failure_is_propagated_unchanged() {
        let mut walker = walker(
            VirtualNode::element("div").child(VirtualNode::component("Widget")),
            RenderOptions::static_markup(),
        );
        let mut emitted = Vec::new();
        let err = loop {
            match walker.step() {
                Ok(Step::Emit(fragment)) => emitted.push(fragment.to_string()),
                Ok(Step::Silent) => {}
                Ok(Step::Done) => panic!("render should fail"),
                Err(err) => break err,
            }
        };
        assert_eq!(emitted, vec!["<div>"]);
        match err {
            RenderError::Collaborator(inner) => {
                assert_eq!(inner.component, "Widget");
                assert_eq!(inner.message, "no component renderer configured");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
