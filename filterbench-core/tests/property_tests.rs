use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use filterbench_core::codec::attributes::{
    read_em_range_items, read_em_range_queries, read_ranges, read_single_values, read_value_sets,
};
use filterbench_core::codec::vecs::decode_fvecs;
use filterbench_core::recall::{score, truncate_groundtruth};
use filterbench_core::{
    build_bitmap, EmRangeItem, EmRangeQuery, Error, ItemAttributes, QueryAttributes, Range,
    SearchOutput,
};
use proptest::prelude::*;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_temp(contents: &str) -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join("filterbench_prop_tests");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join(format!("p_{}_{}.txt", std::process::id(), id));
    std::fs::write(&path, contents).unwrap();
    path
}

fn parse_error_line<T: std::fmt::Debug>(result: filterbench_core::Result<T>) -> Option<usize> {
    match result {
        Err(Error::Parse { line, .. }) => Some(line),
        _ => None,
    }
}

/// Lines with `bad` spliced in at 0-based position `at`.
fn splice(valid: &[String], at: usize, bad: &str) -> String {
    let mut lines: Vec<&str> = valid.iter().map(String::as_str).collect();
    lines.insert(at.min(lines.len()), bad);
    lines.join("\n") + "\n"
}

fn range_strategy() -> impl Strategy<Value = Range> {
    (0..20i32, 0..20i32).prop_map(|(a, b)| Range::new(a, b))
}

fn search_output(k: usize, rows: &[Vec<i64>]) -> SearchOutput {
    let ids: Vec<i64> = rows.iter().flatten().copied().collect();
    let n = ids.len();
    SearchOutput::from_parts(k, ids, vec![0.0; n]).unwrap()
}

proptest! {
    #[test]
    fn test_em_bitmap_matches_oracle(
        items in proptest::collection::vec(0..4i32, 0..30),
        queries in proptest::collection::vec(0..4i32, 0..10)
    ) {
        let bitmap = build_bitmap(
            &ItemAttributes::Em(items.clone()),
            &QueryAttributes::Em(queries.clone()),
        ).unwrap();

        for (q, qv) in queries.iter().enumerate() {
            for (i, iv) in items.iter().enumerate() {
                prop_assert_eq!(bitmap.get(q, i), iv == qv);
            }
        }
    }

    #[test]
    fn test_range_bitmap_matches_oracle(
        items in proptest::collection::vec(-5..25i32, 0..30),
        queries in proptest::collection::vec(range_strategy(), 0..10)
    ) {
        let bitmap = build_bitmap(
            &ItemAttributes::R(items.clone()),
            &QueryAttributes::R(queries.clone()),
        ).unwrap();

        for (q, range) in queries.iter().enumerate() {
            for (i, &v) in items.iter().enumerate() {
                prop_assert_eq!(bitmap.get(q, i), range.start <= v && v <= range.end);
            }
        }
    }

    #[test]
    fn test_emis_bitmap_matches_oracle(
        items in proptest::collection::vec(proptest::collection::vec(0..6i32, 0..5), 0..30),
        queries in proptest::collection::vec(0..6i32, 0..10)
    ) {
        let bitmap = build_bitmap(
            &ItemAttributes::Emis(items.clone()),
            &QueryAttributes::Emis(queries.clone()),
        ).unwrap();

        for (q, qv) in queries.iter().enumerate() {
            for (i, set) in items.iter().enumerate() {
                prop_assert_eq!(bitmap.get(q, i), set.iter().any(|v| v == qv));
            }
        }
    }

    #[test]
    fn test_em_r_bitmap_matches_oracle(
        items in proptest::collection::vec((0..3i32, 0..20i32), 0..30),
        queries in proptest::collection::vec((0..3i32, range_strategy()), 0..10)
    ) {
        let item_records: Vec<EmRangeItem> =
            items.iter().map(|&(em, r)| EmRangeItem { em, r }).collect();
        let query_records: Vec<EmRangeQuery> =
            queries.iter().map(|&(em, range)| EmRangeQuery { em, range }).collect();
        let bitmap = build_bitmap(
            &ItemAttributes::EmR(item_records),
            &QueryAttributes::EmR(query_records),
        ).unwrap();

        for (q, (qem, range)) in queries.iter().enumerate() {
            for (i, (iem, r)) in items.iter().enumerate() {
                let expected = iem == qem && range.start <= *r && *r <= range.end;
                prop_assert_eq!(bitmap.get(q, i), expected);
            }
        }
    }

    #[test]
    fn test_recall_is_order_invariant(
        (gt, found) in proptest::collection::vec(0..50i32, 1..10)
            .prop_flat_map(|gt| {
                let k = gt.len();
                (Just(gt), proptest::collection::vec(-1..50i64, k))
            }),
        seed in any::<u64>()
    ) {
        let k = gt.len();
        let base = score(&[gt.clone()], &search_output(k, &[found.clone()]), k, Some(-1)).unwrap();

        // rotate both lists by a seed-dependent amount and reverse one
        let shift = (seed as usize) % k;
        let mut gt_rotated = gt.clone();
        gt_rotated.rotate_left(shift);
        let mut found_reversed = found.clone();
        found_reversed.reverse();
        found_reversed.rotate_right(shift);

        let permuted = score(&[gt_rotated], &search_output(k, &[found_reversed]), k, Some(-1)).unwrap();
        prop_assert_eq!(base, permuted);
        prop_assert!(base.matched <= base.valid);
    }

    #[test]
    fn test_truncation_ignores_entries_beyond_k(
        prefix in proptest::collection::vec(0..100i32, 1..8),
        suffix in proptest::collection::vec(0..100i32, 0..8),
        found in proptest::collection::vec(0..100i64, 1..8)
    ) {
        let k = prefix.len();
        let mut found = found;
        found.resize(k, -1);

        let mut full = prefix.clone();
        full.extend(&suffix);
        let truncated = truncate_groundtruth(vec![full], k);
        prop_assert_eq!(&truncated[0], &prefix);

        let output = search_output(k, &[found]);
        let from_truncated = score(&truncated, &output, k, Some(-1)).unwrap();
        let from_prefix = score(&[prefix], &output, k, Some(-1)).unwrap();
        prop_assert_eq!(from_truncated, from_prefix);
    }

    #[test]
    fn test_single_value_parse_error_line(
        valid in proptest::collection::vec(any::<i32>(), 0..20),
        at in 0usize..25,
        bad in prop::sample::select(vec!["x", "1,2", "1 ", "", "7a", "--1"])
    ) {
        let lines: Vec<String> = valid.iter().map(|v| v.to_string()).collect();
        let path = write_temp(&splice(&lines, at, bad));
        prop_assert_eq!(parse_error_line(read_single_values(&path)), Some(at.min(lines.len()) + 1));
    }

    #[test]
    fn test_range_parse_error_line(
        valid in proptest::collection::vec(range_strategy(), 0..20),
        at in 0usize..25,
        bad in prop::sample::select(vec!["5", "1-2-3", "1,2", "a-3", "1-", ""])
    ) {
        let lines: Vec<String> = valid.iter().map(|r| format!("{}-{}", r.start, r.end)).collect();
        let path = write_temp(&splice(&lines, at, bad));
        prop_assert_eq!(parse_error_line(read_ranges(&path)), Some(at.min(lines.len()) + 1));
    }

    #[test]
    fn test_value_set_parse_error_line(
        valid in proptest::collection::vec(proptest::collection::vec(0..100i32, 1..5), 0..20),
        at in 0usize..25,
        bad in prop::sample::select(vec!["1,,2", "1,", ",1", "", "1;2", "1, 2"])
    ) {
        let lines: Vec<String> = valid
            .iter()
            .map(|set| set.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
            .collect();
        let path = write_temp(&splice(&lines, at, bad));
        prop_assert_eq!(parse_error_line(read_value_sets(&path)), Some(at.min(lines.len()) + 1));
    }

    #[test]
    fn test_em_range_parse_error_line(
        valid in proptest::collection::vec((0..5i32, range_strategy()), 0..20),
        at in 0usize..25,
        bad in prop::sample::select(vec!["1", "1,2,3", "1;2", "x,2", "1,2x", ""])
    ) {
        let item_lines: Vec<String> = valid.iter().map(|(em, r)| format!("{},{}", em, r.start)).collect();
        let path = write_temp(&splice(&item_lines, at, bad));
        prop_assert_eq!(
            parse_error_line(read_em_range_items(&path)),
            Some(at.min(item_lines.len()) + 1)
        );

        let query_lines: Vec<String> = valid
            .iter()
            .map(|(em, r)| format!("{},{}-{}", em, r.start, r.end))
            .collect();
        let path = write_temp(&splice(&query_lines, at, bad));
        prop_assert_eq!(
            parse_error_line(read_em_range_queries(&path)),
            Some(at.min(query_lines.len()) + 1)
        );
    }

    #[test]
    fn test_truncated_fvecs_record_ends_decoding(
        dim in 1usize..8,
        full in 0usize..10,
        partial in 0usize..8
    ) {
        let mut bytes = Vec::new();
        for row in 0..full {
            bytes.extend_from_slice(&(dim as i32).to_le_bytes());
            for j in 0..dim {
                bytes.extend_from_slice(&((row * dim + j) as f32).to_le_bytes());
            }
        }
        // a header plus fewer than dim payload values
        let partial = partial % dim;
        bytes.extend_from_slice(&(dim as i32).to_le_bytes());
        for j in 0..partial {
            bytes.extend_from_slice(&(j as f32).to_le_bytes());
        }

        let decoded = decode_fvecs(&bytes);
        prop_assert_eq!(decoded.len(), full);
        if full > 0 {
            prop_assert_eq!(decoded.dimension(), dim);
        }
    }
}
