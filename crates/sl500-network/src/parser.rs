//! Incremental accumulator for the CR-terminated line protocol.

use sl500_core::constants::LINE_BUFFER_CAP;

/// Accumulates client bytes into protocol lines.
///
/// A carriage return completes the current line (which may be empty); line
/// feeds are ignored so both `\r` and `\r\n` clients work. A line that
/// exceeds the 50-byte buffer silently resets the accumulator, dropping the
/// partial input.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        LineBuffer {
            buf: Vec::with_capacity(LINE_BUFFER_CAP),
        }
    }

    /// Feed one byte; returns a completed line on a carriage return.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\r' => {
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                Some(line)
            }
            b'\n' => None,
            _ if self.buf.len() >= LINE_BUFFER_CAP => {
                self.buf.clear();
                None
            }
            _ => {
                self.buf.push(byte);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut LineBuffer, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| buffer.push(b)).collect()
    }

    #[test]
    fn carriage_return_completes_a_line() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, b"wait_for_card\r"), vec!["wait_for_card"]);
    }

    #[test]
    fn line_feeds_are_ignored() {
        let mut buffer = LineBuffer::new();
        assert_eq!(
            feed(&mut buffer, b"client_protocol 1.0\r\nexit\r\n"),
            vec!["client_protocol 1.0", "exit"]
        );
    }

    #[test]
    fn bare_carriage_return_is_an_empty_line() {
        let mut buffer = LineBuffer::new();
        assert_eq!(feed(&mut buffer, b"\r"), vec![""]);
    }

    #[test]
    fn overflow_resets_silently() {
        let mut buffer = LineBuffer::new();
        let long = vec![b'x'; 80];
        assert!(feed(&mut buffer, &long).is_empty());
        // The partial line is gone; the next line parses cleanly.
        assert_eq!(feed(&mut buffer, b"exit\r"), vec!["exit"]);
    }

    #[test]
    fn fifty_bytes_still_fit() {
        let mut buffer = LineBuffer::new();
        let line = vec![b'a'; 50];
        let mut input = line.clone();
        input.push(b'\r');
        let lines = feed(&mut buffer, &input);
        assert_eq!(lines, vec![String::from_utf8(line).unwrap()]);
    }

    #[test]
    fn lines_arrive_split_across_reads() {
        let mut buffer = LineBuffer::new();
        assert!(feed(&mut buffer, b"wait_for").is_empty());
        assert_eq!(feed(&mut buffer, b"_card\r"), vec!["wait_for_card"]);
    }
}
