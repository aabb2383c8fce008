//! Random content for test traffic. None of it needs to be more than syntactically valid.

use rand::Rng;

const CALLSIGN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Six random letters and digits followed by a one-digit SSID, e.g. `Q7ZK2A-4`.
pub fn random_callsign<G: Rng>(rng: &mut G) -> String {
    let mut text: String = (0..6)
        .map(|_| CALLSIGN_CHARS[rng.gen_range(0..CALLSIGN_CHARS.len())] as char)
        .collect();
    text.push('-');
    text.push(char::from(b'0' + rng.gen_range(0..10u8)));
    text
}

/// Extend `info` with random printable ASCII until it is `target` bytes long.
pub fn pad_printable<G: Rng>(info: &mut Vec<u8>, target: usize, rng: &mut G) {
    while info.len() < target {
        info.push(rng.gen_range(0x20..=0x7e));
    }
}
