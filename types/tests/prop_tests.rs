use proptest::prelude::*;

use ideas_types::{Address, ContentLocator, Timestamp, UserVote, VoteDecision};

proptest! {
    /// Any 40-digit hex string parses, and the result is the lowercase form.
    #[test]
    fn address_parse_normalises(digits in "[0-9a-fA-F]{40}") {
        let parsed = Address::parse(&format!("0x{digits}")).unwrap();
        prop_assert_eq!(parsed.as_str(), format!("0x{}", digits.to_ascii_lowercase()));
    }

    /// Parsing the display form of an address yields the same address.
    #[test]
    fn address_display_reparses(index in 0u64..u64::MAX) {
        let address = Address::from_index(index);
        let reparsed: Address = address.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, address);
    }

    /// Hex strings of the wrong length are rejected.
    #[test]
    fn address_wrong_length_rejected(digits in "[0-9a-f]{0,39}") {
        let raw = format!("0x{digits}");
        prop_assert!(Address::parse(&raw).is_err());
    }

    /// Only codes 1 and 2 are valid decisions, and code() inverts try_from.
    #[test]
    fn decision_codes(code in 0u8..=u8::MAX) {
        match VoteDecision::try_from(code) {
            Ok(decision) => {
                prop_assert!(code == 1 || code == 2);
                prop_assert_eq!(decision.code(), code);
                prop_assert_eq!(UserVote::from(decision).code(), code);
            }
            Err(_) => prop_assert!(code != 1 && code != 2),
        }
    }

    /// A locator is accepted iff it has a non-whitespace character.
    #[test]
    fn locator_non_blank(raw in "[ a-z]{0,8}") {
        let result = ContentLocator::new(raw.clone());
        prop_assert_eq!(result.is_ok(), !raw.trim().is_empty());
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        prop_assert_eq!(t.elapsed_since(Timestamp::new(base + offset)), offset);
        prop_assert_eq!(Timestamp::new(base + offset + 1).elapsed_since(t), 0);
    }
}
