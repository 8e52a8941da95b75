//! Entry points tying a component renderer and options to a tree.

use crate::channel::{ChunkSink, StringSink, WriterSink};
use crate::component::{ComponentRenderer, NoComponents, RenderContext};
use crate::session::{Progress, RenderSession, SessionStats};
use crate::stream::RenderStream;
use crate::walker::Walker;
use std::io::Write;
use std::sync::Arc;
use xssr_core::{
    AttributeNameMapper, AttributeSerializer, Props, RenderDiagnostics, RenderError,
    RenderOptions, VirtualNode,
};

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The complete markup.
    pub html: String,
    /// Non-fatal findings.
    pub diagnostics: RenderDiagnostics,
    /// Render counters.
    pub stats: SessionStats,
}

/// Reusable render configuration.
///
/// Cloning is cheap; every render gets its own walker, so one renderer can
/// serve any number of concurrent renders.
///
/// ```
/// use xssr_stream::{RenderOptions, StreamRenderer, VirtualNode};
///
/// let renderer =
///     StreamRenderer::without_components().with_options(RenderOptions::static_markup());
/// let root = VirtualNode::element("div")
///     .attr("id", "a")
///     .child(VirtualNode::text("x"))
///     .child(VirtualNode::element("br"));
/// assert_eq!(renderer.render_to_string(root).unwrap(), r#"<div id="a">x<br/></div>"#);
/// ```
#[derive(Clone)]
pub struct StreamRenderer {
    components: Arc<dyn ComponentRenderer>,
    attributes: AttributeSerializer,
    options: Arc<RenderOptions>,
    context: RenderContext,
}

impl std::fmt::Debug for StreamRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRenderer")
            .field("attributes", &self.attributes)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl StreamRenderer {
    /// Creates a renderer expanding components with `components`.
    pub fn new(components: impl ComponentRenderer + 'static) -> Self {
        Self {
            components: Arc::new(components),
            attributes: AttributeSerializer::default(),
            options: Arc::new(RenderOptions::default()),
            context: RenderContext::new(),
        }
    }

    /// Creates a renderer for trees without component nodes.
    pub fn without_components() -> Self {
        Self::new(NoComponents)
    }

    /// Replaces the render options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Replaces the property-to-attribute name mapping.
    pub fn with_attribute_mapper(mut self, mapper: impl AttributeNameMapper + 'static) -> Self {
        self.attributes = AttributeSerializer::new(mapper);
        self
    }

    /// Sets context values visible to every component of a render.
    pub fn with_context(mut self, values: Props) -> Self {
        self.context = RenderContext::from_values(values);
        self
    }

    /// The render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// A walker positioned before `root`.
    pub fn walker(&self, root: VirtualNode) -> Walker {
        Walker::new(
            root,
            Arc::clone(&self.components),
            self.attributes.clone(),
            Arc::clone(&self.options),
            self.context.clone(),
        )
    }

    /// A session rendering `root` into `sink`, driven by the caller.
    pub fn session<S: ChunkSink>(&self, root: VirtualNode, sink: S) -> RenderSession<S> {
        RenderSession::new(self.walker(root), sink)
    }

    /// Renders `root` as a stream of chunks.
    pub fn render_to_stream(&self, root: VirtualNode) -> RenderStream {
        RenderStream::new(self.walker(root))
    }

    /// Renders `root` synchronously, collecting markup and diagnostics.
    pub fn render(&self, root: VirtualNode) -> Result<RenderOutput, RenderError> {
        let mut session = self.session(root, StringSink::new());
        session.run_to_completion()?;
        let diagnostics = session.diagnostics().clone();
        let stats = session.stats();
        Ok(RenderOutput {
            html: session.into_sink().into_output(),
            diagnostics,
            stats,
        })
    }

    /// Renders `root` synchronously to a string.
    pub fn render_to_string(&self, root: VirtualNode) -> Result<String, RenderError> {
        self.render(root).map(|output| output.html)
    }

    /// Renders `root` into `writer`, chunk by chunk, and returns the writer.
    pub fn render_to_writer<W: Write>(
        &self,
        root: VirtualNode,
        writer: W,
    ) -> Result<W, RenderError> {
        let mut session = self.session(root, WriterSink::new(writer));
        let progress = session.run_to_completion()?;
        let (writer, error) = session.into_sink().into_parts();
        if let Some(err) = error {
            return Err(RenderError::Io(err));
        }
        debug_assert_eq!(progress, Progress::Finished);
        Ok(writer)
    }
}

/// Renders `root` as a stream of chunks.
pub fn render_to_stream(
    root: VirtualNode,
    options: RenderOptions,
    components: impl ComponentRenderer + 'static,
) -> RenderStream {
    StreamRenderer::new(components)
        .with_options(options)
        .render_to_stream(root)
}

/// Renders `root` synchronously to a string.
pub fn render_to_string(
    root: VirtualNode,
    options: RenderOptions,
    components: impl ComponentRenderer + 'static,
) -> Result<String, RenderError> {
    StreamRenderer::new(components)
        .with_options(options)
        .render_to_string(root)
}
