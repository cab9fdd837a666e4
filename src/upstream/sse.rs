//! Server-Sent Events parsing for upstream responses.

/// SSE event parsed from an upstream stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: Option<String>,
}

/// Incremental SSE parser.
///
/// Network chunks may split an event, a line or a multi-byte character; bytes
/// are buffered until a complete event (terminated by a blank line) arrives.
/// Line terminators (`\r\n`, `\r` or `\n`) are normalized to `\n` as they
/// are buffered, including a `\r\n` pair split across two chunks.
pub struct SseParser {
    buffer: Vec<u8>,
    after_cr: bool,
}

impl SseParser {
    pub fn new() -> Self {
        SseParser {
            buffer: Vec::new(),
            after_cr: false,
        }
    }

    /// Feed raw bytes and return every event completed by them.
    pub fn parse(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        for &byte in chunk {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.after_cr = false;
                }
            }
        }

        let mut events = vec![];
        while let Some(pos) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&block[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an unterminated trailing event once the upstream body has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.after_cr = false;
        let block = std::mem::take(&mut self.buffer);
        parse_block(&block)
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let mut event = SseEvent::default();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => match event.data {
                Some(ref mut data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => event.data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    if event.data.is_some() || event.event.is_some() {
        Some(event)
    } else {
        None
    }
}
