/// Incremental UTF-8 decoder for the completion byte stream.
///
/// Network chunk boundaries do not respect character boundaries, so an
/// incomplete trailing sequence is held back until the next chunk completes
/// it. Invalid bytes become U+FFFD; decoding never fails.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(
                        &self.pending[start..start + valid],
                    ));
                    match err.error_len() {
                        Some(invalid) => {
                            tracing::debug!(invalid, "replacing invalid utf-8 in completion stream");
                            out.push(char::REPLACEMENT_CHARACTER);
                            start += valid + invalid;
                        }
                        None => {
                            start += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Decodes whatever is still buffered at end of stream.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
