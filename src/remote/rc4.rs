//! RC4 stream cipher used to obscure traffic on password-protected endpoints.
//!
//! The keystream is continuous for the lifetime of a connection: request and
//! response bytes are run through the same state, in transmission order.
//!
//! The RustCrypto cipher fixes the key length in the type. The key schedule
//! only ever reads `key[i % len]` for `i` in `0..256`, so a password of any
//! length is repeated out to 256 bytes, which schedules the same state.

use ::rc4::consts::U256;
use ::rc4::{KeyInit, StreamCipher};

type Keystream = ::rc4::Rc4<U256>;

const SCHEDULE_LEN: usize = 256;

/// RC4 keystream state for one connection.
pub struct Rc4 {
    stream: Keystream,
}

impl Rc4 {
    /// Key-schedule a new stream. An empty key is treated as a single zero byte.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        let key: &[u8] = if key.is_empty() { &[0] } else { key };
        let schedule: Vec<u8> = key.iter().copied().cycle().take(SCHEDULE_LEN).collect();
        Self {
            stream: Keystream::new(schedule.as_slice().into()),
        }
    }

    /// XOR `data` with the next `data.len()` keystream bytes, in place.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.stream.apply_keystream(data);
    }
}

impl std::fmt::Debug for Rc4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rc4 { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_answer_key_plaintext() {
        // Classic test vector: key "Key", plaintext "Plaintext".
        let mut data = *b"Plaintext";
        Rc4::new(b"Key").apply(&mut data);
        assert_eq!(data, [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn known_answer_wiki() {
        let mut data = *b"pedia";
        Rc4::new(b"Wiki").apply(&mut data);
        assert_eq!(data, [0x10, 0x21, 0xBF, 0x04, 0x20]);
    }

    #[test]
    fn known_answer_secret() {
        let mut data = *b"Attack at dawn";
        Rc4::new(b"Secret").apply(&mut data);
        assert_eq!(
            data,
            [0x45, 0xA0, 0x1F, 0x64, 0x5F, 0xC3, 0x5B, 0x38, 0x35, 0x52, 0x54, 0x4B, 0x9B, 0xF5]
        );
    }

    #[test]
    fn stream_is_continuous_across_calls() {
        let mut whole = *b"Attack at dawn";
        Rc4::new(b"Secret").apply(&mut whole);

        let mut split = *b"Attack at dawn";
        let mut cipher = Rc4::new(b"Secret");
        let (a, b) = split.split_at_mut(5);
        cipher.apply(a);
        cipher.apply(b);
        assert_eq!(whole, split);
    }

    #[test]
    fn empty_key_matches_single_zero_byte() {
        let mut empty = *b"ticker";
        Rc4::new(b"").apply(&mut empty);
        let mut zero = *b"ticker";
        Rc4::new(&[0]).apply(&mut zero);
        assert_eq!(empty, zero);
    }

    #[test]
    fn applying_twice_with_fresh_state_round_trips() {
        let mut data = b"ticker".to_vec();
        Rc4::new(b"pw").apply(&mut data);
        Rc4::new(b"pw").apply(&mut data);
        assert_eq!(data, b"ticker");
    }
}
