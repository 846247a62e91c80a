//! Wire-framing decoder for streaming responses.
//!
//! The supported backends stream in one of two framings: Server-Sent Events
//! (`data:` lines terminated by a blank line, with an optional `[DONE]` marker)
//! and line-delimited JSON (one complete JSON document per line). The decoder
//! normalizes both into [`StreamEvent`] values so adapters only deal with
//! payload strings in backend order.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LlmError;
use crate::http::HttpBodyStream;

/// Standardized event yielded by [`StreamDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One payload emitted by the backend: the `data:` value of an SSE event, or
    /// one JSON line.
    Data(String),
    /// Terminal marker reported via SSE `[DONE]`. JSON-lines feeds end at EOF
    /// and never yield this.
    Done,
}

/// Framing used by the backend's streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Server-Sent Events, used by the hosted chat APIs.
    Sse,
    /// Newline-delimited JSON documents, used by local inference servers.
    JsonLines,
}

/// Normalizes a raw HTTP body stream into [`StreamEvent`] values.
///
/// Payloads are yielded strictly in arrival order; the decoder never batches,
/// reorders, or splits backend events.
pub struct StreamDecoder {
    body: HttpBodyStream,
    framing: Framing,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<StreamEvent, LlmError>>,
    provider: &'static str,
    stream_closed: bool,
    done_received: bool,
}

impl StreamDecoder {
    /// Wraps a raw HTTP body stream and prepares it for decoding.
    pub fn new(body: HttpBodyStream, framing: Framing, provider: &'static str) -> Self {
        Self {
            body,
            framing,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            provider,
            stream_closed: false,
            done_received: false,
        }
    }

    /// Shorthand for an SSE decoder.
    pub fn sse(body: HttpBodyStream, provider: &'static str) -> Self {
        Self::new(body, Framing::Sse, provider)
    }

    /// Shorthand for a JSON-lines decoder.
    pub fn json_lines(body: HttpBodyStream, provider: &'static str) -> Self {
        Self::new(body, Framing::JsonLines, provider)
    }

    fn decode_utf8(&self, bytes: Vec<u8>) -> Result<String, LlmError> {
        String::from_utf8(bytes).map_err(|err| {
            LlmError::api(
                self.provider,
                crate::error::STATUS_UNCLASSIFIED,
                format!("invalid UTF-8 in stream chunk: {err}"),
            )
        })
    }

    fn handle_line(&mut self, line: Vec<u8>) -> Result<(), LlmError> {
        match self.framing {
            Framing::Sse => {
                if line.starts_with(b"data:") {
                    let mut data = line[5..].to_vec();
                    if data.first() == Some(&b' ') {
                        data.remove(0);
                    }
                    self.data_lines.push(data);
                }
                Ok(())
            }
            Framing::JsonLines => {
                if line.is_empty() {
                    return Ok(());
                }
                let data = self.decode_utf8(line)?;
                self.pending.push_back(Ok(StreamEvent::Data(data)));
                Ok(())
            }
        }
    }

    /// SSE 空行表示一个事件结束，把累积的 data 行拼成完整 payload
    fn flush_event(&mut self) -> Result<(), LlmError> {
        if self.framing != Framing::Sse || self.data_lines.is_empty() {
            return Ok(());
        }

        let mut joined = Vec::new();
        for (idx, mut segment) in self.data_lines.drain(..).enumerate() {
            if idx > 0 {
                joined.push(b'\n');
            }
            joined.append(&mut segment);
        }
        if joined.is_empty() {
            return Ok(());
        }

        let data = self.decode_utf8(joined)?;
        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(Ok(StreamEvent::Done));
            }
        } else {
            self.pending.push_back(Ok(StreamEvent::Data(data)));
        }
        Ok(())
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for StreamDecoder {
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(event) = this.pending.pop_front() {
            return Poll::Ready(Some(event));
        }

        if this.done_received && this.pending.is_empty() {
            return Poll::Ready(None);
        }

        loop {
            // 先耗尽缓冲区里已经完整的行 再去轮询底层流
            while let Some(line) = Self::drain_line(&mut this.buffer) {
                if line.is_empty() {
                    if let Err(err) = this.flush_event() {
                        return Poll::Ready(Some(Err(err)));
                    }
                } else if let Err(err) = this.handle_line(line) {
                    return Poll::Ready(Some(Err(err)));
                }
                if let Some(event) = this.pending.pop_front() {
                    return Poll::Ready(Some(event));
                }
            }

            if this.stream_closed {
                if !this.buffer.is_empty() {
                    let line = this.buffer.drain(..).collect::<Vec<u8>>();
                    if let Err(err) = this.handle_line(line) {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                if let Err(err) = this.flush_event() {
                    return Poll::Ready(Some(Err(err)));
                }
                return this
                    .pending
                    .pop_front()
                    .map_or(Poll::Ready(None), |event| Poll::Ready(Some(event)));
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(chunk_result)) => match chunk_result {
                    Ok(bytes) => this.buffer.extend_from_slice(&bytes),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Poll::Ready(None) => this.stream_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
