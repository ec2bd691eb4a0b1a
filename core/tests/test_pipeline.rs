// # 📂 `tests/test_pipeline.rs`

// * ✅ parallel output equals single-threaded output and per-segment calls
// * ✅ result ordering under parallelism
// * ✅ borrowed sub-slice input
// * ✅ one failing segment does not stop the others
// * ✅ truncated buffers fail only the affected segments
// * ✅ backpressure with a one-slot channel
// * ✅ parse and config errors abort the container
// * ✅ telemetry totals

#[cfg(test)]
mod tests {
    use seglock_core::config::DecoderConfig;
    use seglock_core::container::{parse, ContainerBuilder, ParseError};
    use seglock_core::crypto::{segment_leaf_index, DecryptError, KeyStore};
    use seglock_core::pipeline::decrypt_container;
    use seglock_core::segment::{decrypt_segment, segment_ciphertext};
    use seglock_core::telemetry::Stage;
    use seglock_core::types::UnlockError;
    use seglock_core::utils::concat_segments;

    const SEGMENTS: usize = 40;

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn segment_len(i: usize) -> usize {
        // Mix of aligned and unaligned lengths.
        1 + (i * 37) % 97
    }

    fn build(base_key: &[u8]) -> Vec<u8> {
        let mut builder = ContainerBuilder::new(base_key).duration_ms(SEGMENTS as u32 * 2000);
        for i in 0..SEGMENTS {
            let payload: Vec<u8> = (0..segment_len(i)).map(|j| (i * 31 + j * 7) as u8).collect();
            builder = builder.segment(i as u32 * 2000, payload);
        }
        builder.build().unwrap()
    }

    fn aes128_key() -> Vec<u8> {
        (100u8..116).collect()
    }

    fn aes256_key() -> Vec<u8> {
        (200u8..232).collect()
    }

    /// Reference output: one `decrypt_segment` call per segment.
    fn sequential_reference(raw: &[u8], store: &KeyStore) -> Vec<u8> {
        let header = parse(raw).unwrap();
        let parts: Vec<_> = (0..header.segment_count())
            .map(|i| {
                let ct = segment_ciphertext(raw, &header, i).unwrap();
                decrypt_segment(store, &header, i as isize, ct).unwrap()
            })
            .collect();
        concat_segments(&parts)
    }

    // ------------------------------------------------------------
    // Equivalence
    // ------------------------------------------------------------
    #[test]
    fn test_parallel_matches_single_threaded() {
        init_tracing();
        let raw = build(&aes128_key());
        let store = KeyStore::new();

        let single = decrypt_container(&raw, &store, &DecoderConfig::single_threaded()).unwrap();
        let parallel = decrypt_container(&raw, &store, &DecoderConfig::with_workers(4)).unwrap();

        let expected = sequential_reference(&raw, &store);
        assert_eq!(single.plaintext().unwrap(), expected);
        assert_eq!(parallel.plaintext().unwrap(), expected);
        assert_eq!(single.telemetry.worker_count, 1);
        assert_eq!(parallel.telemetry.worker_count, 4);
    }

    #[test]
    fn test_results_are_sorted_and_complete() {
        let raw = build(&aes256_key());
        let report = decrypt_container(&raw, &KeyStore::new(), &DecoderConfig::with_workers(8)).unwrap();

        assert_eq!(report.results.len(), SEGMENTS);
        assert!(report.results.iter().enumerate().all(|(i, r)| r.segment_index == i));
        assert!(report.is_complete());
        assert!(report.failures().is_empty());
        for i in 0..SEGMENTS {
            assert_eq!(report.segment(i).and_then(|r| r.plaintext()).map(|p| p.len()), Some(segment_len(i)));
        }
    }

    #[test]
    fn test_cache_setting_does_not_change_output() {
        let raw = build(&aes128_key());
        let store = KeyStore::new();

        let cached = decrypt_container(&raw, &store, &DecoderConfig::with_workers(3)).unwrap();
        let uncached = decrypt_container(
            &raw,
            &store,
            &DecoderConfig { cache_derived_keys: false, ..DecoderConfig::with_workers(3) },
        )
        .unwrap();

        assert_eq!(cached.plaintext().unwrap(), uncached.plaintext().unwrap());
        assert_eq!(uncached.telemetry.cache_hits, 0);
    }

    #[test]
    fn test_one_slot_channels_still_drain() {
        let raw = build(&aes128_key());
        let config = DecoderConfig { inflight_segments: 1, ..DecoderConfig::with_workers(6) };

        let report = decrypt_container(&raw, &KeyStore::new(), &config).unwrap();
        assert_eq!(report.plaintext().unwrap(), sequential_reference(&raw, &KeyStore::new()));
    }

    #[test]
    fn test_borrowed_sub_slice_input() {
        // The container sits at an odd offset inside a larger caller-owned buffer.
        let raw = build(&aes128_key());
        let mut outer = vec![0xA5u8; 3];
        outer.extend_from_slice(&raw);
        outer.extend_from_slice(&[0x5A; 5]);

        let view = &outer[3..3 + raw.len()];
        for config in [DecoderConfig::single_threaded(), DecoderConfig::with_workers(4)] {
            let report = decrypt_container(view, &KeyStore::new(), &config).unwrap();
            assert_eq!(report.plaintext().unwrap(), sequential_reference(&raw, &KeyStore::new()));
        }
    }

    // ------------------------------------------------------------
    // Failure isolation
    // ------------------------------------------------------------
    #[test]
    fn test_failing_segment_is_isolated() {
        init_tracing();
        let raw = build(&aes256_key());
        let header = parse(&raw).unwrap();

        // A 16-byte raw key at segment 5's leaf cannot key AES-256.
        let leaf = segment_leaf_index(header.segment_count(), 5).unwrap();
        let store = KeyStore::new().with_key(leaf, vec![0x11u8; 16]).unwrap();

        let report = decrypt_container(&raw, &store, &DecoderConfig::with_workers(4)).unwrap();
        let baseline = decrypt_container(&raw, &KeyStore::new(), &DecoderConfig::single_threaded()).unwrap();

        assert_eq!(report.failures(), vec![5]);
        assert!(matches!(report.plaintext().unwrap_err(), DecryptError::CipherFailure(_)));
        for i in (0..SEGMENTS).filter(|&i| i != 5) {
            assert_eq!(report.results[i].plaintext(), baseline.results[i].plaintext());
        }
        assert_eq!(report.telemetry.segments_failed, 1);
        assert_eq!(report.telemetry.segments_ok, SEGMENTS as u64 - 1);
    }

    #[test]
    fn test_truncated_buffer_fails_tail_segments_only() {
        let raw = build(&aes128_key());
        let header = parse(&raw).unwrap();
        let cut = header.segment_range(SEGMENTS - 2).unwrap().start as usize + 1;

        for config in [DecoderConfig::single_threaded(), DecoderConfig::with_workers(4)] {
            let report = decrypt_container(&raw[..cut], &KeyStore::new(), &config).unwrap();
            assert_eq!(report.failures(), vec![SEGMENTS - 2, SEGMENTS - 1]);
            assert!(matches!(
                report.results[SEGMENTS - 1].error(),
                Some(DecryptError::Truncated { index, .. }) if *index == SEGMENTS - 1
            ));
            assert!(report.results[..SEGMENTS - 2].iter().all(|r| r.is_ok()));
        }
    }

    // ------------------------------------------------------------
    // Container-level errors
    // ------------------------------------------------------------
    #[test]
    fn test_parse_failure_aborts_container() {
        let mut raw = build(&aes128_key());
        raw[1] = b'?';
        let err = decrypt_container(&raw, &KeyStore::new(), &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, UnlockError::Parse(ParseError::InvalidMagic { .. })));
    }

    #[test]
    fn test_metadata_failure_surfaces_as_parse_error() {
        let mut raw = build(&aes128_key());
        // First metadata byte opens the top-level dictionary.
        raw[16] = b'x';
        assert!(matches!(
            decrypt_container(&raw, &KeyStore::new(), &DecoderConfig::default()).unwrap_err(),
            UnlockError::Parse(ParseError::MetadataDecode(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let raw = build(&aes128_key());
        let config = DecoderConfig { worker_count: Some(0), ..DecoderConfig::default() };
        assert!(matches!(
            decrypt_container(&raw, &KeyStore::new(), &config).unwrap_err(),
            UnlockError::Config(_)
        ));
    }

    // ------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------
    #[test]
    fn test_telemetry_totals() {
        let raw = build(&aes128_key());
        let report = decrypt_container(&raw, &KeyStore::new(), &DecoderConfig::with_workers(2)).unwrap();
        let t = &report.telemetry;

        let total: usize = (0..SEGMENTS).map(segment_len).sum();
        let padding: usize = (0..SEGMENTS).map(|i| 16 - segment_len(i) % 16).sum();

        assert_eq!(t.segments_total, SEGMENTS as u64);
        assert_eq!(t.bytes_ciphertext, total as u64);
        assert_eq!(t.bytes_plaintext, total as u64);
        assert_eq!(t.bytes_padding, padding as u64);
        assert_eq!(t.keys_derived, SEGMENTS as u64);
        assert!(t.sanity_check());
        assert!(t.has_all_stages(&[Stage::Parse, Stage::Derive, Stage::Decrypt]));

        let json = t.to_json().unwrap();
        assert!(json.contains("\"segments_ok\":40"));
    }
}
