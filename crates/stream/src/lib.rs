#![deny(missing_docs)]
//! xssr streaming renderer: incremental, backpressure-aware HTML rendering
//! of virtual document trees.
//!
//! The pieces compose bottom-up. A [`Walker`] serializes one frame per step
//! from an explicit stack, a [`ChunkedChannel`] groups fragments into chunks
//! for a [`ChunkSink`], and a [`RenderSession`] drives both under a
//! [`Scheduler`]. [`StreamRenderer`] wires them together for the common cases.

/// Parallel rendering of independent documents.
pub mod batch;
/// Output buffering and consumers.
pub mod channel;
/// Component collaborator and render context.
pub mod component;
/// Traversal stack entries.
pub mod frame;
/// Configured entry points.
pub mod renderer;
/// Cooperative yield decisions.
pub mod scheduler;
/// Resumable render state machine.
pub mod session;
/// Async stream adapter.
pub mod stream;
/// Explicit-stack serializer.
pub mod walker;

pub use batch::{
    BatchInput, BatchOptions, BatchProcessingResult, BatchResult, BatchStats, render_batch,
};
pub use channel::{
    CallbackSink, ChunkSink, ChunkedChannel, Readiness, StringSink, WriteResult, WriterSink,
};
pub use component::{
    ComponentRegistry, ComponentRenderer, FnRenderer, NoComponents, RenderContext, Rendered,
    props, render_fn,
};
pub use frame::{Phase, TraversalFrame};
pub use renderer::{RenderOutput, StreamRenderer, render_to_stream, render_to_string};
pub use scheduler::{Scheduler, YieldPolicy};
pub use session::{Progress, RenderSession, SessionStats};
pub use stream::RenderStream;
pub use walker::{Step, TEXT_SEPARATOR, Walker};

pub use xssr_core::{
    AttributeNameMapper, AttributeValue, Attributes, CollaboratorError, ComponentRef,
    HtmlPropertyMapper, IdentityMapper, NodePath, PropValue, Props, RenderDiagnostics,
    RenderError, RenderOptions, RenderWarning, VirtualNode,
};
