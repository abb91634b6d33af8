//! Streaming transcoding from UTF-8 into a template's output encoding.

use std::io::{self, Write};

use encoding_rs::{CoderResult, Encoder, Encoding, UTF_8};

/// Wraps a byte sink and re-encodes the UTF-8 written to it.
///
/// Incoming bytes may split a multi-byte character; the incomplete tail is
/// held back until the next write or [`finish`](Self::finish). Characters the
/// target encoding cannot represent become numeric character references.
///
/// The first error returned by the inner sink is kept so callers can tell
/// sink failures apart from errors raised by whatever drives the writer.
pub struct EncodingWriter<W: Write> {
    inner: W,
    encoder: Option<Encoder>,
    pending: Vec<u8>,
    failure: Option<io::Error>,
}

impl<W: Write> EncodingWriter<W> {
    /// Creates a writer encoding into `encoding`'s output encoding.
    pub fn new(inner: W, encoding: &'static Encoding) -> Self {
        let encoding = encoding.output_encoding();
        let encoder = (encoding != UTF_8).then(|| encoding.new_encoder());
        Self {
            inner,
            encoder,
            pending: Vec::new(),
            failure: None,
        }
    }

    /// Takes the sink error recorded during writing, if any.
    pub fn take_failure(&mut self) -> Option<io::Error> {
        self.failure.take()
    }

    /// Encodes whatever is still pending, flushes, and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let pending = std::mem::take(&mut self.pending);
        let tail = String::from_utf8_lossy(&pending);
        self.emit(&tail, true)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn emit(&mut self, text: &str, last: bool) -> io::Result<()> {
        let encoder = match self.encoder.as_mut() {
            Some(encoder) => encoder,
            None => return self.inner.write_all(text.as_bytes()),
        };

        let mut out = Vec::with_capacity(text.len() + 16);
        let mut rest = text;
        loop {
            let (result, read, _) = encoder.encode_from_utf8_to_vec(rest, &mut out, last);
            rest = &rest[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => out.reserve(rest.len() + 16),
            }
        }
        self.inner.write_all(&out)
    }

    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        result.map_err(|err| {
            let surfaced = io::Error::new(err.kind(), err.to_string());
            self.failure.get_or_insert(err);
            surfaced
        })
    }
}

impl<W: Write> Write for EncodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_some() => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, err));
            }
            Err(err) => err.valid_up_to(),
        };
        if valid > 0 {
            let tail = self.pending.split_off(valid);
            let head = std::mem::replace(&mut self.pending, tail);
            let text = String::from_utf8_lossy(&head);
            let result = self.emit(&text, false);
            self.record(result)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.record(result)
    }
}
