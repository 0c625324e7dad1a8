use sha1::{Digest, Sha1};

use crate::utils::types::HashPos;

/// Identifier width of the ring. The hash space is `2^M` and every finger
/// table carries exactly `M` entries.
pub const M: usize = 16;

/// SHA-1 based consistent hashing, used for both peer addresses and storage
/// keys. The full digest interpreted as a big-endian integer reduced mod
/// `2^M` is exactly its last two bytes.
pub fn hash(bytes: &[u8]) -> HashPos {
    let digest = Sha1::digest(bytes);
    HashPos::from_be_bytes([digest[18], digest[19]])
}

/// Start of the arc that finger `index` shortcuts: `(id + 2^index) mod 2^M`.
pub fn finger_start(id: HashPos, index: usize) -> HashPos {
    id.wrapping_add(1 << index)
}

/// `x ∈ (a, b)` in clockwise ring order, wrapping at `2^M`.
///
/// Every ring decision in the crate reduces to this predicate or one of the
/// half-open variants below; identifiers are never compared with a raw `<`
/// anywhere else.
pub fn in_open_arc(x: HashPos, a: HashPos, b: HashPos) -> bool {
    if a < b {
        a < x && x < b
    } else if a > b {
        x > a || x < b
    } else {
        x != a
    }
}

/// `x ∈ (a, b]` in clockwise ring order.
pub fn in_arc_right_closed(x: HashPos, a: HashPos, b: HashPos) -> bool {
    x == b || in_open_arc(x, a, b)
}

/// `x ∈ [a, b)` in clockwise ring order.
pub fn in_arc_left_closed(x: HashPos, a: HashPos, b: HashPos) -> bool {
    x == a || in_open_arc(x, a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_sha1_mod_hash_space() {
        // int(sha1(addr).hexdigest(), 16) % 2**16
        assert_eq!(hash(b"127.0.0.1:8000"), 53596);
        assert_eq!(hash(b"127.0.0.1:8001"), 15158);
        assert_eq!(hash(b"127.0.0.1:9000"), 64421);
        assert_eq!(hash(b"hello"), 17229);
        assert_eq!(hash(b"k1"), 27461);
    }

    #[test]
    fn finger_start_wraps_at_hash_space() {
        assert_eq!(finger_start(0, 0), 1);
        assert_eq!(finger_start(10, 3), 18);
        assert_eq!(finger_start(u16::MAX, 0), 0);
        assert_eq!(finger_start(40_000, 15), ((40_000u32 + 32_768u32) % 65_536u32) as HashPos);
    }

    #[test]
    fn open_arc_without_wrap() {
        assert!(in_open_arc(5, 1, 10));
        assert!(!in_open_arc(1, 1, 10));
        assert!(!in_open_arc(10, 1, 10));
        assert!(!in_open_arc(11, 1, 10));
    }

    #[test]
    fn open_arc_with_wrap() {
        // (60000, 100) crosses zero
        assert!(in_open_arc(65_000, 60_000, 100));
        assert!(in_open_arc(50, 60_000, 100));
        assert!(!in_open_arc(60_000, 60_000, 100));
        assert!(!in_open_arc(100, 60_000, 100));
        assert!(!in_open_arc(30_000, 60_000, 100));
    }

    #[test]
    fn degenerate_arc_covers_everything_but_the_endpoint() {
        assert!(in_open_arc(1, 7, 7));
        assert!(in_open_arc(65_000, 7, 7));
        assert!(!in_open_arc(7, 7, 7));
    }

    #[test]
    fn right_closed_arc_includes_upper_endpoint() {
        assert!(in_arc_right_closed(10, 1, 10));
        assert!(!in_arc_right_closed(1, 1, 10));
        assert!(in_arc_right_closed(100, 60_000, 100));
        assert!(in_arc_right_closed(50, 60_000, 100));
        assert!(!in_arc_right_closed(60_000, 60_000, 100));
    }

    #[test]
    fn left_closed_arc_includes_lower_endpoint() {
        assert!(in_arc_left_closed(1, 1, 10));
        assert!(!in_arc_left_closed(10, 1, 10));
        assert!(in_arc_left_closed(60_000, 60_000, 100));
        assert!(!in_arc_left_closed(100, 60_000, 100));
    }
}
