//! Chunked, backpressure-aware output channel and the consumers it feeds.

use std::io::Write;
use xssr_core::RenderError;

const MAX_PREALLOCATED_CHUNK: usize = 64 * 1024;

/// A consumer's answer to a delivered chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Send more.
    Ready,
    /// Stop until the consumer resumes the session.
    Backpressure,
    /// The consumer is gone; the render should be abandoned.
    Closed,
}

/// Outcome of [`ChunkedChannel::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    /// The fragment was taken into the channel.
    pub accepted: bool,
    /// The consumer is not ready; the writer must pause.
    pub backpressure: bool,
}

/// Downstream consumer of rendered chunks.
///
/// `on_end` and `on_error` are each called at most once, and never both.
pub trait ChunkSink {
    /// Receives the next chunk in document order.
    fn on_data(&mut self, chunk: String) -> Readiness;

    /// The document is complete.
    fn on_end(&mut self);

    /// The render failed; no further chunks follow.
    fn on_error(&mut self, error: &RenderError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Open,
    Ended,
    Failed,
    Released,
}

/// Buffers fragments into chunks of roughly `chunk_size` bytes.
///
/// A fragment is never split: a chunk is delivered as soon as the buffer
/// reaches the threshold, so chunks can exceed it by up to one fragment.
#[derive(Debug)]
pub struct ChunkedChannel<S> {
    sink: S,
    buffer: String,
    chunk_size: usize,
    ready: bool,
    consumer_closed: bool,
    state: ChannelState,
    chunks_delivered: u64,
    bytes_delivered: u64,
}

impl<S: ChunkSink> ChunkedChannel<S> {
    /// Creates an open channel feeding `sink`.
    pub fn new(sink: S, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            sink,
            buffer: String::with_capacity(chunk_size.min(MAX_PREALLOCATED_CHUNK)),
            chunk_size,
            ready: true,
            consumer_closed: false,
            state: ChannelState::Open,
            chunks_delivered: 0,
            bytes_delivered: 0,
        }
    }

    /// Buffers `fragment`, delivering a chunk once the buffer is full.
    pub fn write(&mut self, fragment: &str) -> WriteResult {
        if self.state != ChannelState::Open {
            return WriteResult {
                accepted: false,
                backpressure: false,
            };
        }
        self.buffer.push_str(fragment);
        if self.buffer.len() >= self.chunk_size {
            self.deliver();
        }
        WriteResult {
            accepted: true,
            backpressure: !self.ready,
        }
    }

    /// Delivers whatever is buffered.
    pub fn flush(&mut self) {
        if self.state == ChannelState::Open {
            self.deliver();
        }
    }

    /// Flushes and signals end-of-stream. Only the first call has an effect.
    pub fn close(&mut self) {
        if self.state != ChannelState::Open {
            return;
        }
        self.deliver();
        if self.state == ChannelState::Open {
            self.state = ChannelState::Ended;
            self.sink.on_end();
        }
    }

    /// Drops unflushed bytes and reports `error`. Only the first call has an effect.
    pub fn fail(&mut self, error: &RenderError) {
        if self.state != ChannelState::Open {
            return;
        }
        self.buffer.clear();
        self.state = ChannelState::Failed;
        self.sink.on_error(error);
    }

    /// Drops unflushed bytes without signalling the consumer.
    pub fn release(&mut self) {
        self.buffer.clear();
        if self.state == ChannelState::Open {
            self.state = ChannelState::Released;
        }
    }

    /// The consumer is ready for more data again.
    pub fn resume(&mut self) {
        self.ready = true;
    }

    /// Returns true unless the consumer asked for a pause.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns true while fragments are accepted.
    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Returns true if the consumer answered a chunk with [`Readiness::Closed`].
    pub fn consumer_closed(&self) -> bool {
        self.consumer_closed
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Chunks delivered so far.
    pub fn chunks_delivered(&self) -> u64 {
        self.chunks_delivered
    }

    /// Bytes delivered so far.
    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }

    /// The consumer.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The consumer, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Returns the consumer, dropping anything still buffered.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn deliver(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let capacity = self.chunk_size.min(MAX_PREALLOCATED_CHUNK);
        let chunk = std::mem::replace(&mut self.buffer, String::with_capacity(capacity));
        self.chunks_delivered += 1;
        self.bytes_delivered += chunk.len() as u64;
        match self.sink.on_data(chunk) {
            Readiness::Ready => self.ready = true,
            Readiness::Backpressure => self.ready = false,
            Readiness::Closed => {
                self.ready = false;
                self.consumer_closed = true;
                self.release();
            }
        }
    }
}

/// Collects the whole document into one string.
#[derive(Debug, Default)]
pub struct StringSink {
    output: String,
    chunks: usize,
    ended: bool,
    failed: bool,
}

impl StringSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Chunks received so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Returns true once end-of-stream was signalled.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Returns true if the render failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Takes the collected output.
    pub fn into_output(self) -> String {
        self.output
    }
}

impl ChunkSink for StringSink {
    fn on_data(&mut self, chunk: String) -> Readiness {
        if self.output.is_empty() {
            self.output = chunk;
        } else {
            self.output.push_str(&chunk);
        }
        self.chunks += 1;
        Readiness::Ready
    }

    fn on_end(&mut self) {
        self.ended = true;
    }

    fn on_error(&mut self, _error: &RenderError) {
        self.failed = true;
    }
}

/// Forwards chunks to a [`Write`] implementation.
///
/// A write error closes the sink; the error is kept for [`WriterSink::into_parts`].
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    error: Option<std::io::Error>,
}

impl<W: Write> WriterSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Returns the writer and the first write error, if any.
    pub fn into_parts(self) -> (W, Option<std::io::Error>) {
        (self.writer, self.error)
    }
}

impl<W: Write> ChunkSink for WriterSink<W> {
    fn on_data(&mut self, chunk: String) -> Readiness {
        match self.writer.write_all(chunk.as_bytes()) {
            Ok(()) => Readiness::Ready,
            Err(err) => {
                log::warn!("writer rejected chunk: {}", err);
                self.error = Some(err);
                Readiness::Closed
            }
        }
    }

    fn on_end(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("writer flush failed: {}", err);
            self.error = Some(err);
        }
    }

    fn on_error(&mut self, _error: &RenderError) {}
}

type DataCallback<'a> = Box<dyn FnMut(String) -> Readiness + Send + 'a>;
type EndCallback<'a> = Box<dyn FnOnce() + Send + 'a>;
type ErrorCallback<'a> = Box<dyn FnOnce(&RenderError) + Send + 'a>;

/// Consumer built from data, end and error callbacks.
///
/// ```
/// use xssr_stream::{CallbackSink, ChunkSink, Readiness};
///
/// let mut received = Vec::new();
/// let mut sink = CallbackSink::new(|chunk| {
///     received.push(chunk);
///     Readiness::Ready
/// });
/// sink.on_data("<p>".to_string());
/// drop(sink);
/// assert_eq!(received, vec!["<p>"]);
/// ```
pub struct CallbackSink<'a> {
    on_data: DataCallback<'a>,
    on_end: Option<EndCallback<'a>>,
    on_error: Option<ErrorCallback<'a>>,
}

impl<'a> CallbackSink<'a> {
    /// Creates a sink calling `on_data` for every chunk.
    pub fn new(on_data: impl FnMut(String) -> Readiness + Send + 'a) -> Self {
        Self {
            on_data: Box::new(on_data),
            on_end: None,
            on_error: None,
        }
    }

    /// Sets the end-of-stream callback.
    pub fn with_end(mut self, on_end: impl FnOnce() + Send + 'a) -> Self {
        self.on_end = Some(Box::new(on_end));
        self
    }

    /// Sets the error callback.
    pub fn with_error(mut self, on_error: impl FnOnce(&RenderError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

impl std::fmt::Debug for CallbackSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink")
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl ChunkSink for CallbackSink<'_> {
    fn on_data(&mut self, chunk: String) -> Readiness {
        (self.on_data)(chunk)
    }

    fn on_end(&mut self) {
        if let Some(on_end) = self.on_end.take() {
            on_end();
        }
    }

    fn on_error(&mut self, error: &RenderError) {
        if let Some(on_error) = self.on_error.take() {
            on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<String>,
        answers: Vec<Readiness>,
        ends: usize,
        errors: Vec<String>,
    }

    impl ChunkSink for Recorder {
        fn on_data(&mut self, chunk: String) -> Readiness {
            self.chunks.push(chunk);
            if self.answers.is_empty() {
                Readiness::Ready
            } else {
                self.answers.remove(0)
            }
        }

        fn on_end(&mut self) {
            self.ends += 1;
        }

        fn on_error(&mut self, error: &RenderError) {
            self.errors.push(error.to_string());
        }
    }

    #[test]
    fn batches_fragments_into_chunks() {
        let mut channel = ChunkedChannel::new(Recorder::default(), 8);
        for fragment in ["<p>", "abc", "</p>", "<p>", "d", "</p>"] {
            assert!(channel.write(fragment).accepted);
        }
        assert_eq!(channel.sink().chunks, vec!["<p>abc</p>", "<p>d</p>"]);
        assert_eq!(channel.buffered(), 0);
        assert_eq!(channel.chunks_delivered(), 2);
        assert_eq!(channel.bytes_delivered(), 18);
    }

    #[test]
    fn close_flushes_and_ends_once() {
        let mut channel = ChunkedChannel::new(Recorder::default(), 1024);
        channel.write("<div>");
        channel.write("</div>");
        assert!(channel.sink().chunks.is_empty());

        channel.close();
        channel.close();
        assert_eq!(channel.sink().chunks, vec!["<div></div>"]);
        assert_eq!(channel.sink().ends, 1);
        assert!(!channel.write("late").accepted);
    }

    #[test]
    fn reports_backpressure_until_resumed() {
        let recorder = Recorder {
            answers: vec![Readiness::Backpressure],
            ..Recorder::default()
        };
        let mut channel = ChunkedChannel::new(recorder, 1);

        let result = channel.write("a");
        assert!(result.accepted);
        assert!(result.backpressure);
        assert!(!channel.is_ready());

        channel.resume();
        let result = channel.write("b");
        assert!(!result.backpressure);
        assert_eq!(channel.sink().chunks, vec!["a", "b"]);
    }

    #[test]
    fn fail_discards_buffer_and_reports_once() {
        let mut channel = ChunkedChannel::new(Recorder::default(), 1024);
        channel.write("<ul>");
        let err = RenderError::invalid_tag("");
        channel.fail(&err);
        channel.fail(&err);
        channel.close();

        let sink = channel.into_sink();
        assert!(sink.chunks.is_empty());
        assert_eq!(sink.errors.len(), 1);
        assert_eq!(sink.ends, 0);
    }

    #[test]
    fn consumer_close_releases_the_channel() {
        let recorder = Recorder {
            answers: vec![Readiness::Closed],
            ..Recorder::default()
        };
        let mut channel = ChunkedChannel::new(recorder, 1);
        channel.write("a");
        assert!(channel.consumer_closed());
        assert!(!channel.is_open());

        channel.close();
        assert!(!channel.write("b").accepted);
        assert_eq!(channel.sink().ends, 0);
        assert_eq!(channel.sink().chunks, vec!["a"]);
    }

    #[test]
    fn release_is_silent() {
        let mut channel = ChunkedChannel::new(Recorder::default(), 1024);
        channel.write("pending");
        channel.release();
        channel.close();
        let sink = channel.into_sink();
        assert!(sink.chunks.is_empty());
        assert_eq!(sink.ends, 0);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn writer_sink_forwards_bytes() {
        let mut channel = ChunkedChannel::new(WriterSink::new(Vec::new()), 4);
        channel.write("<b>");
        channel.write("bold");
        channel.write("</b>");
        channel.close();
        let (bytes, error) = channel.into_sink().into_parts();
        assert!(error.is_none());
        assert_eq!(String::from_utf8(bytes).unwrap(), "<b>bold</b>");
    }

    #[test]
    fn callback_sink_calls_end_once() {
        let mut ends = 0;
        {
            let mut sink = CallbackSink::new(|_| Readiness::Ready).with_end(|| ends += 1);
            sink.on_end();
            sink.on_end();
        }
        assert_eq!(ends, 1);
    }
}
