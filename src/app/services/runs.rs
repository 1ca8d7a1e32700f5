//! Run detection over integer position sequences
//!
//! Groups a strictly ascending sequence of day offsets into maximal runs of
//! consecutive values. Isolated single days are dropped: a one-day event is
//! never a spell.

use chrono::NaiveDate;

use crate::constants::{MIN_RUN_DAYS, OUTPUT_DATE_FORMAT};

/// A maximal run of consecutive positions, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

impl Run {
    /// Number of days in the run.
    pub fn days(&self) -> usize {
        self.end - self.start + 1
    }

    /// Render the run as an inclusive date range, `dd/mm/YYYY--dd/mm/YYYY`,
    /// given the date at position zero.
    pub fn format_dates(&self, origin: NaiveDate) -> String {
        let start = origin + chrono::Days::new(self.start as u64);
        let end = origin + chrono::Days::new(self.end as u64);
        format!(
            "{}--{}",
            start.format(OUTPUT_DATE_FORMAT),
            end.format(OUTPUT_DATE_FORMAT)
        )
    }
}

/// Split ascending `positions` into maximal consecutive runs, dropping
/// fragments shorter than two days.
pub fn consecutive_runs(positions: &[usize]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut iter = positions.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };

    let mut start = first;
    let mut prev = first;
    for pos in iter {
        if pos > prev + 1 {
            push_if_long_enough(&mut runs, start, prev);
            start = pos;
        }
        prev = pos;
    }
    push_if_long_enough(&mut runs, start, prev);
    runs
}

fn push_if_long_enough(runs: &mut Vec<Run>, start: usize, end: usize) {
    let run = Run { start, end };
    if run.days() >= MIN_RUN_DAYS {
        runs.push(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_gaps_and_drops_singletons() {
        let runs = consecutive_runs(&[1, 2, 3, 7, 8, 10]);
        assert_eq!(
            runs,
            vec![Run { start: 1, end: 3 }, Run { start: 7, end: 8 }]
        );
    }

    #[test]
    fn test_single_position_yields_no_run() {
        assert!(consecutive_runs(&[4]).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(consecutive_runs(&[]).is_empty());
    }

    #[test]
    fn test_whole_sequence_is_one_run() {
        let runs = consecutive_runs(&[0, 1, 2, 3]);
        assert_eq!(runs, vec![Run { start: 0, end: 3 }]);
        assert_eq!(runs[0].days(), 4);
    }

    #[test]
    fn test_format_dates_inclusive_range() {
        let origin = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let run = Run { start: 2, end: 4 };
        assert_eq!(run.format_dates(origin), "03/01/2020--05/01/2020");
    }
}
