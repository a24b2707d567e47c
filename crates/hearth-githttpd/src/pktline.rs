//! pkt-line framing for the smart protocol.

use std::sync::LazyLock;

use regex::Regex;

use crate::service::Service;

/// The flush packet terminating a pkt-line section.
pub const FLUSH: &[u8] = b"0000";

/// `Git-Protocol` header values must be one or more `key=value` pairs
/// separated by colons. Anything else is dropped rather than rejected, to
/// tolerate clients that don't send the header at all.
static SAFE_GIT_PROTOCOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-zA-Z]+=[0-9a-zA-Z]+(:[0-9a-zA-Z]+=[0-9a-zA-Z]+)*$")
        .expect("protocol pattern compiles")
});

/// Encode one pkt-line: the payload prefixed with the hex length of the
/// whole line, zero-padded to a multiple of 4 hex digits.
pub fn packet_write(payload: &str) -> Vec<u8> {
    let mut length = format!("{:x}", payload.len() + 4);
    if length.len() % 4 != 0 {
        length = "0".repeat(4 - length.len() % 4) + &length;
    }
    let mut pkt = length.into_bytes();
    pkt.extend_from_slice(payload.as_bytes());
    pkt
}

/// Frame a service advertisement: the `# service=` preamble, a flush packet,
/// then the raw advertisement produced by `git --advertise-refs`.
pub fn advertisement(service: Service, body: &[u8]) -> Vec<u8> {
    let mut out = packet_write(&format!("# service=git-{service}\n"));
    out.extend_from_slice(FLUSH);
    out.extend_from_slice(body);
    out
}

/// Validate a `Git-Protocol` request header for forwarding to the
/// subprocess environment. Invalid values are silently discarded.
pub fn safe_git_protocol(header: &str) -> Option<&str> {
    SAFE_GIT_PROTOCOL.is_match(header).then_some(header)
}
