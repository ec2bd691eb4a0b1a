// # 📂 `tests/test_kdf.rs`

// * ✅ SHA-256 ratchet regression vectors
// * ✅ explicit root fallback (store position 1, then container base key)
// * ✅ shallowest ancestor wins; other branches are ignored
// * ✅ key store validation and hex loading
// * ✅ cached and uncached derivation agree
// * ✅ determinism and ancestor substitution (proptest)

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use seglock_core::crypto::{
        derive_key, derive_key_with_base, segment_leaf_index, segment_leaf_offset, DerivedKeyCache,
        KeyDerivationError, KeyDeriver, KeyPath, KeyStore,
    };

    const BASE_KEY_HEX: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";
    const LEAF_4096_FROM_ROOT: &str = "2e122103da45ab138c586779075e508bd0fae520f6d02ae9a7fe36d18ded93c9";
    const LEAF_4097_FROM_ROOT: &str = "6d75abfed229bbaa634f749cddd94d987541cb02b25f8d58bacaccd04154bb3b";
    const LEAF_9_FROM_ROOT: &str = "3ee284f75d1822fa5bd9016bf93871cf4e74fce2bc6b2cf0bbb5e874387bdf8d";

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn base_key() -> Vec<u8> {
        hex::decode(BASE_KEY_HEX).unwrap()
    }

    fn root_store() -> KeyStore {
        KeyStore::new().with_key(1, base_key()).unwrap()
    }

    // ------------------------------------------------------------
    // Regression vectors
    // ------------------------------------------------------------
    #[test]
    fn test_leaf_4096_from_root_key() {
        let key = derive_key(&root_store(), 4096).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(hex::encode(key), LEAF_4096_FROM_ROOT);
    }

    #[test]
    fn test_leaf_4097_from_root_key() {
        // First segment leaf of a 1880-segment container.
        assert_eq!(segment_leaf_index(1880, 0), Some(4097));
        assert_eq!(hex::encode(derive_key(&root_store(), 4097).unwrap()), LEAF_4097_FROM_ROOT);
    }

    #[test]
    fn test_base_key_fallback_matches_root_entry() {
        let via_base = derive_key_with_base(&KeyStore::new(), Some(base_key().as_slice()), 9).unwrap();
        let via_store = derive_key(&root_store(), 9).unwrap();

        assert_eq!(hex::encode(&via_base), LEAF_9_FROM_ROOT);
        assert_eq!(via_base, via_store);
    }

    #[test]
    fn test_store_root_takes_precedence_over_base_key() {
        let other = [0x55u8; 16];
        let with_base = derive_key_with_base(&root_store(), Some(&other[..]), 4096).unwrap();
        assert_eq!(hex::encode(with_base), LEAF_4096_FROM_ROOT);
    }

    #[test]
    fn test_leaf_zero_and_one_return_the_root() {
        assert_eq!(&derive_key(&root_store(), 0).unwrap()[..], base_key().as_slice());
        assert_eq!(&derive_key(&root_store(), 1).unwrap()[..], base_key().as_slice());
    }

    // ------------------------------------------------------------
    // Ancestor selection
    // ------------------------------------------------------------
    #[test]
    fn test_no_applicable_key() {
        assert_eq!(
            derive_key(&KeyStore::new(), 4096).unwrap_err(),
            KeyDerivationError::NoApplicableKey { leaf_index: 4096 }
        );

        // Position 3 is not on the path of 4096 (1, 2, 4, ...).
        let off_path = KeyStore::new().with_key(3, vec![9u8; 32]).unwrap();
        assert_eq!(
            derive_key(&off_path, 4096).unwrap_err(),
            KeyDerivationError::NoApplicableKey { leaf_index: 4096 }
        );
        assert_eq!(
            derive_key_with_base(&off_path, None, 4096).unwrap_err(),
            KeyDerivationError::NoApplicableKey { leaf_index: 4096 }
        );
    }

    #[test]
    fn test_other_branches_are_ignored() {
        let store = root_store().with_key(3, vec![9u8; 32]).unwrap();
        assert_eq!(hex::encode(derive_key(&store, 4096).unwrap()), LEAF_4096_FROM_ROOT);
    }

    #[test]
    fn test_shallowest_ancestor_wins() {
        // A bogus deeper key on the path does not change the result.
        let store = root_store()
            .with_key(2, vec![0xAAu8; 32])
            .unwrap()
            .with_key(4096, vec![0xBBu8; 32])
            .unwrap();
        assert_eq!(hex::encode(derive_key(&store, 4096).unwrap()), LEAF_4096_FROM_ROOT);
    }

    #[test]
    fn test_key_stored_at_leaf_is_used_as_is() {
        let store = KeyStore::new().with_key(4096, vec![0xCCu8; 32]).unwrap();
        assert_eq!(&derive_key(&store, 4096).unwrap()[..], &[0xCCu8; 32][..]);
    }

    #[test]
    fn test_path_skips_position_zero() {
        let path = KeyPath::new(4097);
        assert_eq!(path.depth(), 13);
        assert_eq!(path.root_level(), 1);
        assert_eq!(path.ancestors().next(), Some((1, 1)));
        assert_eq!(path.ancestors().last(), Some((13, 4097)));
    }

    #[test]
    fn test_segment_subtree_offsets() {
        assert_eq!(segment_leaf_offset(1), Some(3));
        assert_eq!(segment_leaf_offset(2), Some(5));
        assert_eq!(segment_leaf_offset(3), Some(9));
        assert_eq!(segment_leaf_offset(1880), Some(4097));
        assert_eq!(segment_leaf_index(3, 2), Some(11));
    }

    #[test]
    fn test_segment_subtree_beyond_u64_is_none() {
        // 2^62 segments is the last count whose subtree still fits.
        assert_eq!(segment_leaf_offset(1 << 62), Some((1u64 << 63) + 1));
        assert_eq!(segment_leaf_offset((1 << 62) + 1), None);
        assert_eq!(segment_leaf_index((1 << 62) + 1, 0), None);
        assert_eq!(segment_leaf_index(1 << 62, (1 << 63) - 1), None);
    }

    // ------------------------------------------------------------
    // Key store
    // ------------------------------------------------------------
    #[test]
    fn test_key_store_validation() {
        let mut store = KeyStore::new();
        assert_eq!(
            store.insert(0, vec![0u8; 16]).unwrap_err(),
            KeyDerivationError::InvalidPosition { position: 0 }
        );
        assert_eq!(
            store.insert(5, vec![0u8; 20]).unwrap_err(),
            KeyDerivationError::InvalidKeyMaterial { position: 5, len: 20 }
        );
        assert!(store.is_empty());

        store.insert(5, vec![0u8; 16]).unwrap();
        store.insert(6, vec![0u8; 32]).unwrap();
        assert_eq!(store.positions().collect::<Vec<_>>(), vec![5, 6]);
        assert!(store.contains(6));
    }

    #[test]
    fn test_key_store_from_hex() {
        let store = KeyStore::from_hex_pairs([(1u64, BASE_KEY_HEX)]).unwrap();
        assert_eq!(store, root_store());

        let err = KeyStore::from_hex_pairs([(7u64, "zz")]).unwrap_err();
        assert!(matches!(err, KeyDerivationError::InvalidHex { position: 7, .. }));
    }

    #[test]
    fn test_debug_output_hides_key_bytes() {
        let rendered = format!("{:?}", root_store());
        assert!(rendered.contains("positions"));
        assert!(!rendered.to_lowercase().contains(BASE_KEY_HEX));
        assert!(!rendered.contains("15, 30, 45"));
    }

    // ------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------
    #[test]
    fn test_cached_derivation_matches_uncached() {
        let store = root_store();
        let cache = DerivedKeyCache::new();
        let deriver = KeyDeriver::new(&store).with_cache(&cache);

        let first = deriver.derive(4096).unwrap();
        let second = deriver.derive(4096).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, derive_key(&store, 4096).unwrap());
        assert_eq!((cache.hits(), cache.misses(), cache.len()), (1, 1, 1));
    }

    #[test]
    fn test_deriver_base_key_fallback() {
        let store = KeyStore::new();
        let base = base_key();
        let deriver = KeyDeriver::new(&store).with_base_key(&base);
        assert_eq!(hex::encode(deriver.derive(9).unwrap()), LEAF_9_FROM_ROOT);
        assert!(KeyDeriver::new(&store).derive(9).is_err());
    }

    // ------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------
    proptest! {
        #[test]
        fn prop_derivation_is_deterministic(leaf in any::<u64>(), root in any::<[u8; 32]>()) {
            let store = KeyStore::new().with_key(1, root.to_vec()).unwrap();
            let a = derive_key(&store, leaf).unwrap();
            let b = derive_key(&store, leaf).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_ancestor_key_substitutes_for_root(
            leaf in 1u64..(1u64 << 48),
            shift in 0u32..48,
            root in any::<[u8; 16]>(),
        ) {
            let ancestor = leaf >> shift;
            prop_assume!(ancestor >= 1);

            let root_only = KeyStore::new().with_key(1, root.to_vec()).unwrap();
            let ancestor_key = derive_key(&root_only, ancestor).unwrap();
            let ancestor_only = KeyStore::new().with_key(ancestor, ancestor_key).unwrap();

            prop_assert_eq!(
                derive_key(&ancestor_only, leaf).unwrap(),
                derive_key(&root_only, leaf).unwrap()
            );
        }

        #[test]
        fn prop_segment_leaves_share_one_subtree_level(count in 1usize..5000) {
            let first = segment_leaf_index(count, 0).unwrap();
            let last = segment_leaf_index(count, count - 1).unwrap();
            prop_assert_eq!(64 - first.leading_zeros(), 64 - last.leading_zeros());
        }
    }
}
