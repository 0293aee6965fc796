//! Identity name validation.
//!
//! A valid name is a lowercase ASCII letter followed by one or more of
//! `[a-z0-9_]`.

/// Returns true if `token` is a well-formed identity name
pub fn is_valid_name(token: &str) -> bool {
    let mut bytes = token.bytes();

    match bytes.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    let mut rest = 0usize;
    for b in bytes {
        if !(b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_') {
            return false;
        }
        rest += 1;
    }

    rest >= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_names() {
        for name in ["ab", "alice", "a1", "a_", "bob_42", "x_y_z", "z9999999"] {
            assert!(is_valid_name(name), "should accept {:?}", name);
        }
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in [
            "",
            "a",
            "Alice",
            "aLice",
            "1alice",
            "_alice",
            "al-ice",
            "al.ice",
            "al ice",
            "alicé",
            "ä1",
        ] {
            assert!(!is_valid_name(name), "should reject {:?}", name);
        }
    }
}
