//! # Packet framing.
//!
//! A datagram travels over a text stream as a single tagged line:
//! ```text
//! <prefix> <base64(datagram)>\n
//! ```
//! which is exactly what [`Demux`](crate::Demux) recognizes as tagged. The demultiplexer
//! strips `<prefix> `, so [`decode`] consumes only the base64 lines.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Encodes `datagram` as one tagged line.
pub fn encode(prefix: &str, datagram: &[u8]) -> Vec<u8> {
    let mut line = String::with_capacity(prefix.len() + 2 + datagram.len().div_ceil(3) * 4);
    line.push_str(prefix);
    line.push(' ');
    BASE64.encode_string(datagram, &mut line);
    line.push('\n');
    line.into_bytes()
}

/// Decodes a buffer of base64 lines (prefix already stripped) into datagrams.
///
/// Blank lines are ignored. A line that is not valid base64 is logged and skipped;
/// the remaining lines are still decoded.
pub fn decode(tagged: &[u8]) -> Vec<Vec<u8>> {
    tagged
        .split(|&b| b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match BASE64.decode(line) {
            Ok(datagram) => Some(datagram),
            Err(e) => {
                tracing::warn!(error = %e, len = line.len(), "failed to decode packet line");
                None
            }
        })
        .collect()
}
