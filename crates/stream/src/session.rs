//! One render: walker, channel and scheduler driven together.
//!
//! A [`RenderSession`] is a synchronous state machine. Each [`RenderSession::pump`]
//! runs frames until the scheduler asks for a yield, the consumer applies
//! backpressure, or the render reaches a terminal state. The host decides
//! what to do in between; nothing here blocks or spawns.

use crate::channel::{ChunkSink, ChunkedChannel};
use crate::scheduler::{Scheduler, YieldPolicy};
use crate::walker::{Step, Walker};
use std::time::{Duration, Instant};
use xssr_core::{RenderDiagnostics, RenderError};

/// Why [`RenderSession::pump`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A yield point: call `pump` again when convenient.
    Yielded,
    /// The consumer is not ready; call [`RenderSession::resume`] first.
    Paused,
    /// The document is complete and end-of-stream was signalled.
    Finished,
    /// The render failed earlier; the error was already reported.
    Failed,
    /// The render was abandoned by the host or the consumer.
    Aborted,
}

impl Progress {
    /// Returns true for states no further `pump` can leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running,
    Paused { since: Instant },
    Finished,
    Failed,
    Aborted,
}

/// Counters describing a render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Walker frames processed.
    pub frames: u64,
    /// Scheduler yield points taken.
    pub yields: u64,
    /// Times the consumer paused the render.
    pub pauses: u64,
    /// Chunks delivered.
    pub chunks: u64,
    /// Bytes delivered.
    pub bytes: u64,
}

/// State of one render.
#[derive(Debug)]
pub struct RenderSession<S> {
    walker: Walker,
    channel: ChunkedChannel<S>,
    scheduler: Scheduler,
    backpressure_timeout: Option<Duration>,
    state: SessionState,
    started: bool,
    pauses: u64,
}

impl<S: ChunkSink> RenderSession<S> {
    /// Creates a session rendering `walker`'s tree into `sink`.
    pub fn new(walker: Walker, sink: S) -> Self {
        let options = walker.options();
        let channel = ChunkedChannel::new(sink, options.chunk_size());
        let scheduler = Scheduler::new(YieldPolicy::from_options(options));
        let backpressure_timeout = options.backpressure_timeout();
        Self {
            walker,
            channel,
            scheduler,
            backpressure_timeout,
            state: SessionState::Running,
            started: false,
            pauses: 0,
        }
    }

    /// Runs frames until a yield point, a pause or a terminal state.
    ///
    /// A fatal error is reported to the consumer and returned exactly once;
    /// afterwards `pump` keeps answering [`Progress::Failed`].
    pub fn pump(&mut self) -> Result<Progress, RenderError> {
        match self.state {
            SessionState::Finished => return Ok(Progress::Finished),
            SessionState::Failed => return Ok(Progress::Failed),
            SessionState::Aborted => return Ok(Progress::Aborted),
            SessionState::Paused { since } => {
                self.check_timeout(since)?;
                return Ok(Progress::Paused);
            }
            SessionState::Running => {}
        }
        if !self.started {
            self.started = true;
            log::debug!(
                "render started (chunk size {}, yield every {} frames)",
                self.walker.options().chunk_size(),
                self.scheduler.policy().frame_threshold()
            );
        }
        self.scheduler.reset();

        loop {
            let written = match self.walker.step() {
                Ok(Step::Emit(fragment)) => Some(self.channel.write(fragment)),
                Ok(Step::Silent) => None,
                Ok(Step::Done) => return Ok(self.finish()),
                Err(err) => return Err(self.fail(err)),
            };

            if let Some(written) = written {
                if self.channel.consumer_closed() {
                    self.walker.abandon();
                    self.state = SessionState::Aborted;
                    log::debug!("consumer closed the output; render aborted");
                    return Ok(Progress::Aborted);
                }
                if written.backpressure {
                    self.state = SessionState::Paused {
                        since: Instant::now(),
                    };
                    self.pauses += 1;
                    log::trace!(
                        "paused on backpressure after {} frames",
                        self.walker.frames_processed()
                    );
                    return Ok(Progress::Paused);
                }
            }

            if self.scheduler.tick() {
                log::trace!(
                    "yielding after {} frames (depth {})",
                    self.walker.frames_processed(),
                    self.walker.depth()
                );
                return Ok(Progress::Yielded);
            }
        }
    }

    /// Lets a paused render continue; a no-op in any other state.
    ///
    /// Fails with [`RenderError::BackpressureTimeout`] if the pause outlived
    /// the configured limit.
    pub fn resume(&mut self) -> Result<(), RenderError> {
        if let SessionState::Paused { since } = self.state {
            self.check_timeout(since)?;
            self.channel.resume();
            self.state = SessionState::Running;
            log::trace!("resumed after {:?}", since.elapsed());
        }
        Ok(())
    }

    /// Abandons the render. Buffered bytes are dropped and the consumer gets
    /// neither end nor error. Terminal sessions are left as they are.
    pub fn abort(&mut self) {
        match self.state {
            SessionState::Finished | SessionState::Failed | SessionState::Aborted => {}
            SessionState::Running | SessionState::Paused { .. } => {
                self.walker.abandon();
                self.channel.release();
                self.state = SessionState::Aborted;
                log::debug!(
                    "render aborted after {} frames",
                    self.walker.frames_processed()
                );
            }
        }
    }

    /// Pumps until a terminal state, resuming immediately on every pause.
    ///
    /// Meant for consumers that never hold output back, such as
    /// [`StringSink`](crate::StringSink).
    pub fn run_to_completion(&mut self) -> Result<Progress, RenderError> {
        loop {
            match self.pump()? {
                Progress::Yielded => {}
                Progress::Paused => self.resume()?,
                terminal => return Ok(terminal),
            }
        }
    }

    /// Returns true while the consumer holds the render back.
    pub fn is_paused(&self) -> bool {
        matches!(self.state, SessionState::Paused { .. })
    }

    /// Returns true once the session can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Finished | SessionState::Failed | SessionState::Aborted
        )
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames: self.walker.frames_processed(),
            yields: self.scheduler.yields(),
            pauses: self.pauses,
            chunks: self.channel.chunks_delivered(),
            bytes: self.channel.bytes_delivered(),
        }
    }

    /// Non-fatal findings so far.
    pub fn diagnostics(&self) -> &RenderDiagnostics {
        self.walker.diagnostics()
    }

    /// The consumer.
    pub fn sink(&self) -> &S {
        self.channel.sink()
    }

    /// The consumer, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        self.channel.sink_mut()
    }

    /// Ends the session and returns the consumer.
    pub fn into_sink(self) -> S {
        self.channel.into_sink()
    }

    fn finish(&mut self) -> Progress {
        self.channel.close();
        if self.channel.consumer_closed() {
            self.state = SessionState::Aborted;
            log::debug!("consumer closed the output during the final flush");
            return Progress::Aborted;
        }
        self.state = SessionState::Finished;
        let stats = self.stats();
        log::debug!(
            "render finished: {} frames, {} chunks, {} bytes, {} yields",
            stats.frames,
            stats.chunks,
            stats.bytes,
            stats.yields
        );
        Progress::Finished
    }

    fn fail(&mut self, err: RenderError) -> RenderError {
        self.walker.abandon();
        self.channel.fail(&err);
        self.state = SessionState::Failed;
        log::debug!("render failed: {}", err);
        err
    }

    fn check_timeout(&mut self, since: Instant) -> Result<(), RenderError> {
        if let Some(limit) = self.backpressure_timeout {
            if since.elapsed() >= limit {
                return Err(self.fail(RenderError::BackpressureTimeout { limit }));
            }
        }
        Ok(())
    }
}
