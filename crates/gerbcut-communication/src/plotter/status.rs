//! Status query and response parsing

use gerbcut_core::DeviceState;

/// `ESC ENQ`, answered with a single status digit
pub const STATUS_QUERY: [u8; 2] = [0x1b, 0x05];

/// Map a status response to a device state.
///
/// The first non-whitespace byte decides; anything unrecognized is `Unknown`.
pub fn parse_status(response: &[u8]) -> DeviceState {
    match response.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'0') => DeviceState::Ready,
        Some(b'1') => DeviceState::Moving,
        Some(b'2') => DeviceState::NotReady,
        Some(b'3') => DeviceState::Paused,
        _ => DeviceState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_digits() {
        assert_eq!(parse_status(b"0"), DeviceState::Ready);
        assert_eq!(parse_status(b"1\x03"), DeviceState::Moving);
        assert_eq!(parse_status(b"  2"), DeviceState::NotReady);
        assert_eq!(parse_status(b"3"), DeviceState::Paused);
    }

    #[test]
    fn test_parse_status_unknown() {
        assert_eq!(parse_status(b""), DeviceState::Unknown);
        assert_eq!(parse_status(b"7"), DeviceState::Unknown);
        assert_eq!(parse_status(b"\x03"), DeviceState::Unknown);
    }
}
