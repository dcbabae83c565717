//! In-memory server transcripts for adapter tests.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::io::{AsyncRead, AsyncWrite, Cursor};

/// Everything the client wrote, readable after the stream has been moved
/// into a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Replays a fixed server script. Once the script is exhausted the stream
/// reports end of file, or the configured I/O error.
#[derive(Debug)]
pub(crate) struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Transcript,
    failure: Option<io::ErrorKind>,
}

impl ScriptedStream {
    pub(crate) fn new(script: &str) -> Self {
        Self {
            input: Cursor::new(script.as_bytes().to_vec()),
            written: Transcript::default(),
            failure: None,
        }
    }

    /// Ends the script with an I/O error instead of a clean close.
    pub(crate) fn then_fail(mut self, kind: io::ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    pub(crate) fn transcript(&self) -> Transcript {
        self.written.clone()
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.input).poll_read(cx, buf) {
            Poll::Ready(Ok(0)) if !buf.is_empty() => match this.failure {
                Some(kind) => Poll::Ready(Err(io::Error::new(kind, "scripted failure"))),
                None => Poll::Ready(Ok(0)),
            },
            other => other,
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
