//! Property-based tests for record parsing and de-duplication.

#[cfg(test)]
mod proptest_tests {
    use crate::collection::dedup_records;
    use crate::record::{normalize_comment, EnvRecord, KeyAffix, Source};
    use proptest::prelude::*;

    fn source() -> impl Strategy<Value = Source> {
        prop_oneof![Just(Source::Manifest), Just(Source::DotFile)]
    }

    /// Records whose value is derived from the key, so groups never conflict.
    fn agreeing_records() -> impl Strategy<Value = Vec<EnvRecord>> {
        prop::collection::vec(("[A-E]", source()), 0..20).prop_map(|items| {
            items
                .into_iter()
                .map(|(key, source)| {
                    let value = key.to_lowercase();
                    EnvRecord::new(key, value, source)
                })
                .collect()
        })
    }

    fn rendered(records: &[EnvRecord]) -> Vec<String> {
        records.iter().map(ToString::to_string).collect()
    }

    proptest! {
        #[test]
        fn normalize_comment_is_idempotent(input in ".*") {
            let once = normalize_comment(&input);
            prop_assert_eq!(normalize_comment(&once), once.clone());
        }

        #[test]
        fn normalized_comment_never_starts_with_marker(input in ".*") {
            let normalized = normalize_comment(&input);
            prop_assert!(!normalized.starts_with('#'));
            prop_assert_eq!(normalized.trim(), normalized.as_str());
        }

        #[test]
        fn declaration_line_reparses_to_same_record(
            key in "[A-Z_][A-Z0-9_]{0,10}",
            value in "#?[a-z0-9./:-]{1,12}",
            comment in "([a-z]{1,5}( [a-z]{1,5})?)?",
        ) {
            let mut record = EnvRecord::new(key.as_str(), value.as_str(), Source::DotFile);
            record.set_comment(&comment);
            let line = record.to_string();

            let reparsed = EnvRecord::parse(&line, &KeyAffix::none(), Source::DotFile).unwrap();
            prop_assert_eq!(&reparsed.key, &key);
            prop_assert_eq!(&reparsed.value, &value);
            prop_assert_eq!(&reparsed.comment, &comment);
            prop_assert_eq!(reparsed.to_string(), line);
        }

        #[test]
        fn dedup_leaves_unique_keys(records in agreeing_records()) {
            let outcome = dedup_records(records.clone(), Vec::new()).unwrap();
            let mut keys: Vec<&str> = outcome.records.iter().map(|r| r.key.as_str()).collect();
            let total = keys.len();
            keys.sort_unstable();
            keys.dedup();
            prop_assert_eq!(keys.len(), total);
        }

        #[test]
        fn dedup_keeps_first_appearance_order(records in agreeing_records()) {
            let mut expected: Vec<String> = Vec::new();
            for record in &records {
                if !expected.contains(&record.key) {
                    expected.push(record.key.clone());
                }
            }
            let outcome = dedup_records(records, Vec::new()).unwrap();
            let order: Vec<String> = outcome.records.iter().map(|r| r.key.clone()).collect();
            prop_assert_eq!(order, expected);
        }

        #[test]
        fn dedup_is_idempotent(records in agreeing_records()) {
            let once = dedup_records(records, Vec::new()).unwrap().records;
            let twice = dedup_records(once.clone(), Vec::new()).unwrap().records;
            prop_assert_eq!(rendered(&twice), rendered(&once));
        }
    }
}
