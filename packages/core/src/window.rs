//! Window filter.
//!
//! Selects the records of one block-height window, optionally restricted to
//! a single forecaster. Windows are validated before anything is indexed:
//! an over-wide span, a bound outside the dataset, or an empty dataset all
//! come back as a [`Diagnostic`] and nothing is selected.

use crate::config::Config;
use crate::error::Diagnostic;
use crate::record::ForecastRecord;

/// How `start`/`end` are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Bounds are block heights, matched against each record's `block_height`.
    #[default]
    BlockHeight,
    /// Bounds are positions in the (forecaster-filtered) sequence.
    Position,
}

impl WindowMode {
    fn unit(self) -> &'static str {
        match self {
            WindowMode::BlockHeight => "Blocks",
            WindowMode::Position => "Entries",
        }
    }
}

/// Maximum `end - start` per window mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    pub max_block_span: u64,
    pub max_position_span: u64,
}

impl WindowLimits {
    pub fn max_span(&self, mode: WindowMode) -> u64 {
        match mode {
            WindowMode::BlockHeight => self.max_block_span,
            WindowMode::Position => self.max_position_span,
        }
    }
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for WindowLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_block_span: config.max_block_span,
            max_position_span: config.max_position_span,
        }
    }
}

/// Inclusive `[start, end]` window as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub start: i64,
    pub end: i64,
}

impl BlockWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Inclusive on both ends.
    pub fn contains(&self, block_height: u64) -> bool {
        let height = i128::from(block_height);
        i128::from(self.start) <= height && height <= i128::from(self.end)
    }
}

/// Ordered subset of a loaded record sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    records: Vec<&'a ForecastRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a ForecastRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ForecastRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&'a ForecastRecord> {
        self.records.first().copied()
    }

    pub fn last(&self) -> Option<&'a ForecastRecord> {
        self.records.last().copied()
    }

    pub fn block_heights(&self) -> Vec<u64> {
        self.iter().map(|record| record.block_height).collect()
    }

    /// Values of one fee field, `None` where a record lacks it.
    pub fn fee_series(&self, key: &str) -> Vec<Option<u64>> {
        self.iter().map(|record| record.fee(key)).collect()
    }

    /// Clone the selection out, e.g. to filter it again.
    pub fn to_records(&self) -> Vec<ForecastRecord> {
        self.iter().cloned().collect()
    }

    /// Keep the records whose block height lies in `window`, unvalidated.
    ///
    /// This is the predicate [`select`] applies once the window has passed
    /// its checks. Applying it again to its own output changes nothing.
    /// Calling [`select`] again on a selection is not equivalent: the
    /// narrowed sequence ends at or below `window.end`, so the bounds check
    /// rejects the same window.
    pub fn within(&self, window: BlockWindow) -> FilteredView<'a> {
        let records = self
            .records
            .iter()
            .copied()
            .filter(|record| window.contains(record.block_height))
            .collect();
        FilteredView { records }
    }
}

/// Records tagged with `forecaster`, or every record when `None`.
pub fn by_forecaster<'a>(
    records: &'a [ForecastRecord],
    forecaster: Option<&str>,
) -> FilteredView<'a> {
    let records = records
        .iter()
        .filter(|record| forecaster.map_or(true, |name| record.is_from(name)))
        .collect();
    FilteredView { records }
}

/// Select the records inside `window`.
pub fn select<'a>(
    records: &'a [ForecastRecord],
    window: BlockWindow,
    forecaster: Option<&str>,
    mode: WindowMode,
    limits: &WindowLimits,
) -> Result<FilteredView<'a>, Diagnostic> {
    let max = limits.max_span(mode);
    if window.span() > i64::try_from(max).unwrap_or(i64::MAX) {
        return Err(Diagnostic::ExceededMaxSpan {
            requested: window.span(),
            max,
            unit: mode.unit(),
        });
    }

    let last = records.last().ok_or(Diagnostic::DataNotProvided)?;

    match mode {
        WindowMode::BlockHeight => {
            check_bounds(window, last.block_height)?;
            Ok(by_forecaster(records, forecaster).within(window))
        }
        WindowMode::Position => {
            let candidates = by_forecaster(records, forecaster);
            check_bounds(window, candidates.len() as u64)?;
            // Bounds are checked non-negative and below the length above.
            let (start, end) = (window.start as usize, window.end as usize);
            Ok(FilteredView {
                records: candidates.records[start..=end].to_vec(),
            })
        }
    }
}

/// `0 <= start <= end < limit`.
fn check_bounds(window: BlockWindow, limit: u64) -> Result<(), Diagnostic> {
    let end_in_range = u64::try_from(window.end).map_or(false, |end| end < limit);
    if window.start < 0 || window.start > window.end || !end_in_range {
        return Err(Diagnostic::InvalidRange {
            start: window.start,
            end: window.end,
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn make_record(block_height: u64, forecaster: Option<&str>) -> ForecastRecord {
        let base = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let mut fees = BTreeMap::new();
        fees.insert("mempool_fee_rate_estimate".to_string(), 5);
        ForecastRecord {
            timestamp: base + Duration::minutes(block_height as i64),
            block_height,
            forecaster: forecaster.map(str::to_string),
            fees,
        }
    }

    fn heights(view: &FilteredView<'_>) -> Vec<u64> {
        view.block_heights()
    }

    fn select_with<'a>(
        records: &'a [ForecastRecord],
        (start, end): (i64, i64),
        forecaster: Option<&str>,
        mode: WindowMode,
    ) -> Result<FilteredView<'a>, Diagnostic> {
        select(
            records,
            BlockWindow::new(start, end),
            forecaster,
            mode,
            &WindowLimits::default(),
        )
    }

    fn select_blocks(
        records: &[ForecastRecord],
        start: i64,
        end: i64,
    ) -> Result<FilteredView<'_>, Diagnostic> {
        select_with(records, (start, end), None, WindowMode::BlockHeight)
    }

    // ---- block-height windows ----

    #[test]
    fn selects_inclusive_window() {
        let records: Vec<_> = (100..=102).map(|h| make_record(h, None)).collect();
        let view = select_blocks(&records, 100, 101).unwrap();
        assert_eq!(heights(&view), vec![100, 101]);
    }

    #[test]
    fn negative_start_is_invalid_range() {
        let records: Vec<_> = (100..=102).map(|h| make_record(h, None)).collect();
        let err = select_blocks(&records, -1, 50).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRange { start: -1, end: 50, limit: 102 }));
    }

    #[test]
    fn end_at_last_height_is_invalid_range() {
        let records: Vec<_> = (100..=102).map(|h| make_record(h, None)).collect();
        let err = select_blocks(&records, 100, 102).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRange { .. }));
    }

    #[test]
    fn reversed_window_is_invalid_range() {
        let records: Vec<_> = (100..=110).map(|h| make_record(h, None)).collect();
        let err = select_blocks(&records, 105, 101).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRange { .. }));
    }

    #[test]
    fn span_over_maximum_is_rejected_before_bounds() {
        let records: Vec<_> = (100..=102).map(|h| make_record(h, None)).collect();
        let err = select_blocks(&records, 0, 250).unwrap_err();
        assert_eq!(err.to_string(), "Blocks exceeded maximum threshold of 200 Blocks");
    }

    #[test]
    fn span_equal_to_maximum_is_allowed() {
        let records: Vec<_> = (0..=300).map(|h| make_record(h, None)).collect();
        let view = select_blocks(&records, 0, 200).unwrap();
        assert_eq!(view.len(), 201);
    }

    #[test]
    fn empty_input_is_data_not_provided() {
        let err = select_blocks(&[], 0, 10).unwrap_err();
        assert!(matches!(err, Diagnostic::DataNotProvided));
    }

    #[test]
    fn forecaster_filter_keeps_only_matching_tags() {
        let records = vec![
            make_record(10, Some("Mempool Forecast")),
            make_record(10, Some("Block Forecast")),
            make_record(11, Some("Mempool Forecast")),
            make_record(12, Some("Block Forecast")),
            make_record(20, Some("Mempool Forecast")),
        ];
        let view = select_with(
            &records,
            (10, 12),
            Some("Mempool Forecast"),
            WindowMode::BlockHeight,
        )
        .unwrap();
        assert_eq!(heights(&view), vec![10, 11]);
        assert!(view.iter().all(|r| r.is_from("Mempool Forecast")));
    }

    #[test]
    fn unknown_forecaster_selects_nothing() {
        let records: Vec<_> = (0..10)
            .map(|h| make_record(h, Some("Mempool Forecast")))
            .collect();
        let view = select_with(&records, (0, 5), Some("Nobody"), WindowMode::BlockHeight).unwrap();
        assert!(view.is_empty());
    }

    // ---- positional windows ----

    #[test]
    fn position_mode_indexes_into_sequence() {
        let records: Vec<_> = [500, 500, 501, 503, 510]
            .iter()
            .map(|&h| make_record(h, None))
            .collect();
        let view = select_with(&records, (1, 3), None, WindowMode::Position).unwrap();
        assert_eq!(heights(&view), vec![500, 501, 503]);
    }

    #[test]
    fn position_mode_limits_end_to_record_count() {
        let records: Vec<_> = (0..5).map(|h| make_record(h, None)).collect();
        let err = select_with(&records, (0, 5), None, WindowMode::Position).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRange { limit: 5, .. }));
    }

    #[test]
    fn position_mode_uses_its_own_span_limit() {
        let records: Vec<_> = (0..3000).map(|h| make_record(h, None)).collect();
        assert!(select_with(&records, (0, 1500), None, WindowMode::Position).is_ok());
        let err = select_with(&records, (0, 2500), None, WindowMode::Position).unwrap_err();
        assert_eq!(err.to_string(), "Entries exceeded maximum threshold of 2000 Entries");
    }

    #[test]
    fn position_mode_counts_after_forecaster_filter() {
        let records = vec![
            make_record(1, Some("A")),
            make_record(1, Some("B")),
            make_record(2, Some("A")),
            make_record(2, Some("B")),
        ];
        let view = select_with(&records, (1, 1), Some("B"), WindowMode::Position).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.first().unwrap().block_height, 2);
    }

    // ---- view helpers ----

    #[test]
    fn by_forecaster_none_keeps_everything() {
        let records: Vec<_> = (0..4).map(|h| make_record(h, Some("A"))).collect();
        assert_eq!(by_forecaster(&records, None).len(), 4);
        assert_eq!(by_forecaster(&records, Some("B")).len(), 0);
    }

    #[test]
    fn fee_series_reports_missing_keys() {
        let records: Vec<_> = (0..2).map(|h| make_record(h, None)).collect();
        let view = by_forecaster(&records, None);
        assert_eq!(view.fee_series("mempool_fee_rate_estimate"), vec![Some(5), Some(5)]);
        assert_eq!(view.fee_series("missing"), vec![None, None]);
    }

    #[test]
    fn within_keeps_inclusive_bounds() {
        let records: Vec<_> = (98..=104).map(|h| make_record(h, None)).collect();
        let view = by_forecaster(&records, None).within(BlockWindow::new(100, 102));
        assert_eq!(heights(&view), vec![100, 101, 102]);
    }

    #[test]
    fn reselecting_a_selection_fails_the_bounds_check() {
        let records: Vec<_> = (100..=102).map(|h| make_record(h, None)).collect();
        let once = select_blocks(&records, 100, 101).unwrap().to_records();
        assert_eq!(once.len(), 2);

        let err = select_blocks(&once, 100, 101).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRange { limit: 101, .. }));

        let view = by_forecaster(&once, None).within(BlockWindow::new(100, 101));
        assert_eq!(view.to_records(), once);
    }

    proptest! {
        #[test]
        fn prop_selection_matches_predicate(
            steps in prop::collection::vec(0u64..3, 1..120),
            start in 0i64..150,
            span in 0i64..200,
        ) {
            let mut height = 0u64;
            let records: Vec<_> = steps
                .iter()
                .map(|step| {
                    height += step;
                    make_record(height, None)
                })
                .collect();
            let end = start + span;

            match select_blocks(&records, start, end) {
                Ok(view) => {
                    let expected: Vec<u64> = records
                        .iter()
                        .map(|r| r.block_height)
                        .filter(|&h| (start as u64) <= h && h <= end as u64)
                        .collect();
                    prop_assert_eq!(view.block_heights(), expected);
                }
                Err(Diagnostic::InvalidRange { .. }) => {
                    prop_assert!(end as u64 >= records.last().unwrap().block_height);
                }
                Err(other) => prop_assert!(false, "unexpected diagnostic: {}", other),
            }
        }

        #[test]
        fn prop_window_filter_is_idempotent(
            steps in prop::collection::vec(0u64..3, 0..120),
            start in 0i64..150,
            span in 0i64..200,
        ) {
            let mut height = 0u64;
            let records: Vec<_> = steps
                .iter()
                .map(|step| {
                    height += step;
                    make_record(height, None)
                })
                .collect();
            let window = BlockWindow::new(start, start + span);

            let once = by_forecaster(&records, None).within(window);
            let twice = once.within(window);
            prop_assert_eq!(twice.to_records(), once.to_records());
            prop_assert!(once.iter().all(|r| window.contains(r.block_height)));
        }
    }
}
