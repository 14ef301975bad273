//! IRC identifiers - RFC 1459 case-mapped comparison
//!
//! Letters fold to upper case and `{|}~` fold onto `[\]^`, the characters
//! they are the "lower case" of under the protocol's naming rules. All
//! other bytes compare as themselves.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

const fn build_casemap() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let mut c = b'a';
    while c <= b'z' {
        table[c as usize] = c - (b'a' - b'A');
        c += 1;
    }
    table[b'{' as usize] = b'[';
    table[b'|' as usize] = b'\\';
    table[b'}' as usize] = b']';
    table[b'~' as usize] = b'^';
    table
}

static CASEMAP: [u8; 256] = build_casemap();

/// Fold one byte
#[inline]
pub fn fold(byte: u8) -> u8 {
    CASEMAP[byte as usize]
}

/// Three-way comparison of the folded forms of `a` and `b`
pub fn identifier_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.iter().map(|&c| fold(c)).cmp(b.iter().map(|&c| fold(c)))
}

/// `identifier_cmp` as -1, 0 or 1
pub fn identifier_cmp_int(a: &[u8], b: &[u8]) -> i32 {
    match identifier_cmp(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Owned name whose equality, ordering and hash follow the case map
#[derive(Clone)]
pub struct Identifier(Box<[u8]>);

impl Identifier {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into().into_boxed_slice())
    }

    /// The name as given
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name after case folding
    pub fn folded(&self) -> Vec<u8> {
        self.0.iter().map(|&c| fold(c)).collect()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        identifier_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        identifier_cmp(&self.0, &other.0)
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &c in self.0.iter() {
            state.write_u8(fold(c));
        }
        state.write_usize(self.0.len());
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_documented_examples() {
        assert_eq!(identifier_cmp_int(b"somenick", b"SOMENICK"), 0);
        assert_eq!(identifier_cmp_int(b"surprise{|}~", b"surprise[\\]^"), 0);
        assert_eq!(identifier_cmp_int(b"apple", b"zebra"), -1);
        assert_eq!(identifier_cmp_int(b"zebra", b"apple"), 1);
    }

    #[test]
    fn test_prefix_is_less() {
        assert_eq!(identifier_cmp(b"chat", b"CHATTER"), Ordering::Less);
        assert_eq!(identifier_cmp(b"", b""), Ordering::Equal);
    }

    #[test]
    fn test_only_mapped_punctuation_folds() {
        assert_eq!(fold(b'{'), b'[');
        assert_eq!(fold(b'~'), b'^');
        assert_eq!(fold(b'['), b'[');
        assert_eq!(fold(b'_'), b'_');
        assert_eq!(fold(b'@'), b'@');
        assert_eq!(fold(0xC9), 0xC9);
    }

    #[test]
    fn test_identifier_set_membership() {
        let mut names = HashSet::new();
        names.insert(Identifier::from("Nick{away}"));
        assert!(names.contains(&Identifier::from("NICK[AWAY]")));
        assert!(!names.contains(&Identifier::from("nick")));
    }

    proptest! {
        #[test]
        fn prop_antisymmetric(a in proptest::collection::vec(any::<u8>(), 0..24),
                              b in proptest::collection::vec(any::<u8>(), 0..24)) {
            prop_assert_eq!(identifier_cmp(&a, &b), identifier_cmp(&b, &a).reverse());
        }

        #[test]
        fn prop_equal_iff_folded_equal(a in "[a-zA-Z{|}~\\[\\]^_0-9]{0,12}",
                                       b in "[a-zA-Z{|}~\\[\\]^_0-9]{0,12}") {
            let (a, b) = (Identifier::from(a.as_str()), Identifier::from(b.as_str()));
            prop_assert_eq!(a == b, a.folded() == b.folded());
        }

        #[test]
        fn prop_case_insensitive(s in "[a-z{|}~]{0,16}") {
            let upper: String = s.chars().map(|c| match c {
                '{' => '[',
                '|' => '\\',
                '}' => ']',
                '~' => '^',
                c => c.to_ascii_uppercase(),
            }).collect();
            prop_assert_eq!(identifier_cmp_int(s.as_bytes(), upper.as_bytes()), 0);
        }
    }
}
