use proptest::prelude::*;

use gavel_types::{Amount, AssetId, ProposalId, Timestamp};

proptest! {
    /// ProposalId big-endian bytes preserve numeric ordering.
    #[test]
    fn proposal_id_byte_order_matches_numeric(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let (ia, ib) = (ProposalId::new(a), ProposalId::new(b));
        prop_assert_eq!(ia.to_be_bytes() < ib.to_be_bytes(), a < b);
        prop_assert_eq!(ProposalId::from_be_bytes(ia.to_be_bytes()), ia);
    }

    /// ProposalId bincode serialization roundtrip.
    #[test]
    fn proposal_id_bincode_roundtrip(raw in 0u64..u64::MAX) {
        let id = ProposalId::new(raw);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: ProposalId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// AssetId parses back from its display form.
    #[test]
    fn asset_id_display_parse(raw in 0u64..u64::MAX) {
        let asset = AssetId::new(raw);
        prop_assert_eq!(asset.to_string().parse::<AssetId>().unwrap(), asset);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
    }

    /// plus_secs then remaining_from counts back down to the offset.
    #[test]
    fn timestamp_deadline_arithmetic(start in 0u64..1_000_000, period in 0u64..1_000_000) {
        let created = Timestamp::new(start);
        let deadline = created.plus_secs(period);
        prop_assert_eq!(deadline.remaining_from(created), period);
        prop_assert_eq!(created.elapsed_since(deadline), period);
        prop_assert_eq!(deadline.remaining_from(deadline), 0);
    }

    /// Amount: checked_sub returns None exactly when b > a.
    #[test]
    fn amount_checked_sub_underflow(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = Amount::new(a).checked_sub(Amount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(Amount::new(a - b)));
        }
    }

    /// Amount: saturating_sub never panics and returns ZERO on underflow.
    #[test]
    fn amount_saturating_sub(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = Amount::new(a).saturating_sub(Amount::new(b));
        prop_assert_eq!(result, Amount::new(a.saturating_sub(b)));
    }

    /// Amount: raw display/parse roundtrip through FromStr.
    #[test]
    fn amount_parse_raw(raw in 0u128..u128::MAX) {
        prop_assert_eq!(raw.to_string().parse::<Amount>().unwrap(), Amount::new(raw));
    }
}
