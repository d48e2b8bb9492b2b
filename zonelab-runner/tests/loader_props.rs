//! Property tests for the CSV loader.
//!
//! 1. Lenient mode accounts for every row: kept + skipped = rows
//! 2. Strict mode fails exactly when some row is malformed
//! 3. Loaded series are strictly increasing whatever the row order

use proptest::prelude::*;
use zonelab_runner::{read_csv, LoadOptions};

#[derive(Debug, Clone)]
enum Row {
    Good { minute: u32, close: f64 },
    Garbage(String),
}

fn arb_row() -> impl Strategy<Value = Row> {
    prop_oneof![
        4 => (0u32..600, 100.0f64..200.0).prop_map(|(minute, close)| Row::Good { minute, close }),
        1 => "[a-z ]{0,12}".prop_map(Row::Garbage),
    ]
}

fn render(rows: &[Row]) -> String {
    rows.iter()
        .map(|row| match row {
            Row::Good { minute, close } => format!(
                "2024.01.02 {:02}:{:02},{close:.3},{:.3},{:.3},{close:.3},5,3\n",
                minute / 60,
                minute % 60,
                close + 0.01,
                close - 0.01
            ),
            Row::Garbage(s) => format!("{s},1,1,1,1,1\n"),
        })
        .collect()
}

fn distinct_minutes(rows: &[Row]) -> usize {
    let mut minutes: Vec<u32> = rows
        .iter()
        .filter_map(|r| match r {
            Row::Good { minute, .. } => Some(*minute),
            Row::Garbage(_) => None,
        })
        .collect();
    minutes.sort_unstable();
    minutes.dedup();
    minutes.len()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lenient_mode_accounts_for_every_row(rows in prop::collection::vec(arb_row(), 1..80)) {
        let kept = distinct_minutes(&rows);
        match read_csv(render(&rows).as_bytes(), &LoadOptions::default()) {
            Ok(data) => {
                prop_assert_eq!(data.series.len(), kept);
                prop_assert_eq!(data.series.len() + data.skipped_rows, rows.len());
                prop_assert!(data
                    .series
                    .windows(2)
                    .all(|w| w[0].timestamp < w[1].timestamp));
            }
            Err(_) => prop_assert_eq!(kept, 0),
        }
    }

    #[test]
    fn strict_mode_fails_on_any_garbage(rows in prop::collection::vec(arb_row(), 1..40)) {
        let has_garbage = rows.iter().any(|r| matches!(r, Row::Garbage(_)));
        let opts = LoadOptions { strict: true, ..LoadOptions::default() };
        let result = read_csv(render(&rows).as_bytes(), &opts);
        prop_assert_eq!(result.is_err(), has_garbage);
    }
}
