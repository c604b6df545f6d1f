//! Property-based tests for authenticator-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use authenticator_core::{
    pin::PinInput, AccountUid, CredentialStore, PinCode, PIN_LENGTH, PIN_SEPARATOR,
};
use proptest::prelude::*;
use tempfile::tempdir;

// ============================================
// Arbitrary Implementations
// ============================================

fn arb_uid() -> impl Strategy<Value = AccountUid> {
    any::<[u64; 2]>().prop_map(AccountUid)
}

/// Raw press codes look like button bitmasks
fn arb_press() -> impl Strategy<Value = u64> {
    prop_oneof![(0u32..64).prop_map(|bit| 1u64 << bit), 1u64..=u64::MAX]
}

fn arb_presses() -> impl Strategy<Value = [u64; PIN_LENGTH]> {
    prop::array::uniform4(arb_press())
}

proptest! {
    // ----------------------------------------
    // PIN Encoding Properties
    // ----------------------------------------

    #[test]
    fn pin_encoding_is_deterministic(presses in arb_presses()) {
        prop_assert_eq!(PinCode::encode(&presses), PinCode::encode(&presses));
    }

    #[test]
    fn pin_encoding_has_four_fields(presses in arb_presses()) {
        let pin = PinCode::encode(&presses);
        let fields: Vec<u64> = pin
            .as_str()
            .split(PIN_SEPARATOR)
            .map(|f| f.parse().unwrap())
            .collect();
        prop_assert_eq!(fields, presses.to_vec());
    }

    #[test]
    fn pin_encoding_is_order_sensitive(presses in arb_presses(), i in 0usize..PIN_LENGTH, j in 0usize..PIN_LENGTH) {
        prop_assume!(presses[i] != presses[j]);
        let mut swapped = presses;
        swapped.swap(i, j);
        prop_assert_ne!(PinCode::encode(&presses), PinCode::encode(&swapped));
    }

    #[test]
    fn pin_input_yields_encoded_pin(presses in arb_presses()) {
        let mut input = PinInput::new();
        for code in &presses[..PIN_LENGTH - 1] {
            prop_assert!(input.push(*code).is_none());
        }
        let pin = input.push(presses[PIN_LENGTH - 1]);
        prop_assert_eq!(pin, Some(PinCode::encode(&presses)));
        prop_assert!(input.is_empty());
    }

    // ----------------------------------------
    // AccountUid Properties
    // ----------------------------------------

    #[test]
    fn uid_string_roundtrip(uid in arb_uid()) {
        let recovered: AccountUid = uid.to_string().parse().unwrap();
        prop_assert_eq!(uid, recovered);
    }

    #[test]
    fn uid_json_roundtrip(uid in arb_uid()) {
        let json = serde_json::to_string(&uid).unwrap();
        let recovered: AccountUid = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(uid, recovered);
    }

    #[test]
    fn uid_parse_never_panics(s in "\\PC*") {
        let _ = s.parse::<AccountUid>();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // ----------------------------------------
    // Credential Store Properties
    // ----------------------------------------

    #[test]
    fn store_keeps_last_pin_per_user(
        entries in prop::collection::vec((0u64..4, arb_presses()), 1..8)
    ) {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("passwords.json"));

        let mut expected = std::collections::BTreeMap::new();
        for (user, presses) in &entries {
            let uid = AccountUid::new(0, user + 1);
            let pin = PinCode::encode(presses);
            store.save(&uid, &pin).unwrap();
            expected.insert(uid, pin);
        }

        let credentials = store.load();
        prop_assert_eq!(credentials.len(), expected.len());
        for (uid, pin) in &expected {
            let stored = store.get(uid);
            prop_assert_eq!(stored.as_ref(), Some(pin));
        }
    }
}
