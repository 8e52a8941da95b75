//! `futures::Stream` adapter over a render session.

use crate::channel::{ChunkSink, Readiness};
use crate::session::{Progress, RenderSession, SessionStats};
use crate::walker::Walker;
use futures::stream::{FusedStream, Stream};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use xssr_core::{RenderDiagnostics, RenderError};

/// Holds delivered chunks until the stream is polled.
#[derive(Debug)]
struct QueueSink {
    queue: VecDeque<String>,
    high_water: usize,
}

impl ChunkSink for QueueSink {
    fn on_data(&mut self, chunk: String) -> Readiness {
        self.queue.push_back(chunk);
        if self.queue.len() >= self.high_water {
            Readiness::Backpressure
        } else {
            Readiness::Ready
        }
    }

    fn on_end(&mut self) {}

    // Errors reach the poller through `pump`.
    fn on_error(&mut self, _error: &RenderError) {}
}

/// Rendered chunks as an asynchronous stream.
///
/// Scheduler yield points surface as `Poll::Pending` with the task woken
/// immediately, so other futures on the same executor get a turn. At most
/// `maxPendingChunks` chunks are held back when the consumer is slow; the
/// render pauses until it polls again. A failed render yields the chunks
/// already delivered, then the error, then ends. Dropping the stream aborts
/// the render.
#[derive(Debug)]
pub struct RenderStream {
    session: RenderSession<QueueSink>,
    pending_error: Option<RenderError>,
    done: bool,
}

impl RenderStream {
    /// Streams the tree of `walker`.
    pub fn new(walker: Walker) -> Self {
        let high_water = walker.options().max_pending_chunks();
        let sink = QueueSink {
            queue: VecDeque::with_capacity(high_water),
            high_water,
        };
        Self {
            session: RenderSession::new(walker, sink),
            pending_error: None,
            done: false,
        }
    }

    /// Stops rendering. Chunks not yet polled are dropped.
    pub fn abort(&mut self) {
        self.session.abort();
        self.session.sink_mut().queue.clear();
        self.pending_error = None;
        self.done = true;
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Non-fatal findings so far.
    pub fn diagnostics(&self) -> &RenderDiagnostics {
        self.session.diagnostics()
    }

    /// Chunks rendered but not yet polled.
    pub fn pending_chunks(&self) -> usize {
        self.session.sink().queue.len()
    }
}

impl Stream for RenderStream {
    type Item = Result<String, RenderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(chunk) = this.session.sink_mut().queue.pop_front() {
                if this.session.is_paused() {
                    if let Err(err) = this.session.resume() {
                        this.pending_error = Some(err);
                    }
                }
                return Poll::Ready(Some(Ok(chunk)));
            }
            if let Some(err) = this.pending_error.take() {
                this.done = true;
                return Poll::Ready(Some(Err(err)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match this.session.pump() {
                Ok(Progress::Yielded) => {
                    if this.session.sink().queue.is_empty() {
                        cx.waker().wake_by_ref();
                        return Poll::Pending;
                    }
                }
                Ok(Progress::Paused) => {
                    if this.session.sink().queue.is_empty() {
                        if let Err(err) = this.session.resume() {
                            this.pending_error = Some(err);
                        }
                    }
                }
                Ok(Progress::Finished | Progress::Failed | Progress::Aborted) => this.done = true,
                Err(err) => this.pending_error = Some(err),
            }
        }
    }
}

impl FusedStream for RenderStream {
    fn is_terminated(&self) -> bool {
        self.done && self.pending_error.is_none() && self.session.sink().queue.is_empty()
    }
}

impl Drop for RenderStream {
    fn drop(&mut self) {
        self.session.abort();
    }
}
