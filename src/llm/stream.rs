//! Line framing of streamed completion bodies
//!
//! OpenAI streams server-sent events (`data: {...}` lines ending with
//! `data: [DONE]`), Ollama streams one JSON object per line. Both are read
//! through [`response_lines`].

use crate::error::{LlmError, Result};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};

/// Answer text as it is generated, one delta per item
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Split a streamed body into lines without their terminator; a last line
/// without a newline is still yielded
pub fn response_lines(response: reqwest::Response) -> BoxStream<'static, Result<String>> {
    body_lines(Box::pin(response.bytes_stream())).boxed()
}

fn body_lines<S>(bytes: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
{
    stream::unfold((bytes, Vec::new(), false), |(mut bytes, mut buffer, mut finished)| async move {
        loop {
            if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                return Some((Ok(decode_line(&line)), (bytes, buffer, finished)));
            }

            if finished {
                if buffer.is_empty() {
                    return None;
                }
                let line = decode_line(&buffer);
                buffer.clear();
                return Some((Ok(line), (bytes, buffer, finished)));
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    buffer.clear();
                    return Some((Err(LlmError::Transport(e).into()), (bytes, buffer, true)));
                }
                None => finished = true,
            }
        }
    })
}

fn decode_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
