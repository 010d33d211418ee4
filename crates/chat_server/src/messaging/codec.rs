//! Line codec: frames a TCP byte stream into chat lines.
//!
//! Inbound lines end at `\n`; a trailing `\r` is dropped so both Unix and
//! telnet-style clients work. Outbound lines get a `\n` appended.
//!
//! Lines longer than the configured maximum are not an error for the
//! stream. The codec discards the oversized line up to its newline and
//! yields a single [`InboundLine::TooLong`], then carries on with the next
//! line, so the handler can tell the client and keep the connection.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// One decoded unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A complete line with its terminator removed
    Line(String),
    /// A line exceeded the maximum length and was dropped
    TooLong,
}

/// A tokio codec that frames chat lines on `\n` boundaries.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    discarding: bool,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            discarding: false,
        }
    }

    fn finish_line(&mut self, raw: &[u8]) -> InboundLine {
        if std::mem::take(&mut self.discarding) {
            return InboundLine::TooLong;
        }
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.len() > self.max_length {
            return InboundLine::TooLong;
        }
        InboundLine::Line(String::from_utf8_lossy(line).into_owned())
    }
}

impl Decoder for LineCodec {
    type Item = InboundLine;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let raw = src.split_to(pos);
                src.advance(1); // skip \n
                Ok(Some(self.finish_line(&raw)))
            }
            None => {
                // Room for the line plus an optional \r.
                if src.len() > self.max_length + 1 {
                    self.discarding = true;
                    src.clear();
                }
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() && !self.discarding {
            return Ok(None);
        }
        // Peer closed mid-line: treat what is left as the final line.
        let raw = src.split();
        Ok(Some(self.finish_line(&raw)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Option<InboundLine> {
        Some(InboundLine::Line(s.to_string()))
    }

    #[test]
    fn decode_complete_line() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("/broadcast hi\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("/broadcast hi"));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_strips_carriage_return() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("alice\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("alice"));
    }

    #[test]
    fn decode_partial_line_then_complete() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("/msg al");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ice hi\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("/msg alice hi"));
    }

    #[test]
    fn decode_two_lines_in_one_read() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("alice\npw1\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("alice"));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("pw1"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn empty_line_is_a_line() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line(""));
    }

    #[test]
    fn overlong_line_split_across_reads_is_discarded_once() {
        let mut codec = LineCodec::new(8);
        let mut buf = BytesMut::from("0123456789abc");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"more junk\nok\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(InboundLine::TooLong));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("ok"));
    }

    #[test]
    fn overlong_line_in_one_read() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from("abcdef\nabcd\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(InboundLine::TooLong));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("abcd"));
    }

    #[test]
    fn line_at_limit_with_crlf_is_accepted() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from("abcd\r");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("abcd"));
    }

    #[test]
    fn eof_flushes_unterminated_line() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("/exit");
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), line("/exit"));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encode_appends_newline() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::new();
        codec.encode("Enter username: ".to_string(), &mut buf).unwrap();
        codec.encode("[bob]: hi".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"Enter username: \n[bob]: hi\n");
    }
}
