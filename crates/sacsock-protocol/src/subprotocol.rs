//! WebSocket subprotocol negotiation for sac-sock.

/// The only subprotocol a sac-sock endpoint speaks.
pub const SUBPROTOCOL: &str = "sac-sock";

/// Check whether a `Sec-WebSocket-Protocol` header value offers sac-sock.
///
/// The header is a comma-separated list; whitespace around entries is ignored.
#[must_use]
pub fn is_supported(header_value: &str) -> bool {
    header_value.split(',').any(|p| p.trim() == SUBPROTOCOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subprotocol_negotiation() {
        assert!(is_supported("sac-sock"));
        assert!(is_supported("chat, sac-sock"));
        assert!(is_supported(" sac-sock ,other"));
        assert!(!is_supported("sac-sock2"));
        assert!(!is_supported(""));
    }
}
