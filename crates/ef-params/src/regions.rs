//! Administrative regions and embedded school-holiday periods.
//!
//! German counties carry a five-digit id whose leading digits identify the
//! federal state. Holiday periods are half-open `[start, end)` date ranges
//! for the 2020/21 school year, kept sorted by start date per state.

use core::fmt;

use ef_core::date::{date, Date};

/// Id of a German county (Landkreis).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountyId(pub u32);

/// Id of a German federal state (Bundesland), 1..=16.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl fmt::Debug for CountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountyId({})", self.0)
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.0)
    }
}

/// The state a county belongs to (leading digits of the county id).
pub fn get_state_id(county: CountyId) -> StateId {
    StateId(county.0 / 1000)
}

/// School-holiday periods of the 2020/21 school year, `[start, end)`.
pub type HolidaySpan = (Date, Date);

static HOLIDAYS_01_SH: &[HolidaySpan] = &[
    (date(2020, 6, 29), date(2020, 8, 9)),
    (date(2020, 10, 5), date(2020, 10, 17)),
    (date(2020, 12, 21), date(2021, 1, 7)),
    (date(2021, 4, 1), date(2021, 4, 17)),
    (date(2021, 6, 21), date(2021, 8, 1)),
];

static HOLIDAYS_02_HH: &[HolidaySpan] = &[
    (date(2020, 6, 25), date(2020, 8, 6)),
    (date(2020, 10, 5), date(2020, 10, 17)),
    (date(2020, 12, 21), date(2021, 1, 5)),
    (date(2021, 3, 1), date(2021, 3, 13)),
    (date(2021, 5, 10), date(2021, 5, 15)),
    (date(2021, 6, 24), date(2021, 8, 5)),
];

static HOLIDAYS_03_NI: &[HolidaySpan] = &[
    (date(2020, 7, 16), date(2020, 8, 27)),
    (date(2020, 10, 12), date(2020, 10, 24)),
    (date(2020, 12, 23), date(2021, 1, 9)),
    (date(2021, 3, 29), date(2021, 4, 10)),
    (date(2021, 7, 22), date(2021, 9, 2)),
];

static HOLIDAYS_04_HB: &[HolidaySpan] = &[
    (date(2020, 7, 16), date(2020, 8, 27)),
    (date(2020, 10, 12), date(2020, 10, 25)),
    (date(2020, 12, 23), date(2021, 1, 9)),
    (date(2021, 3, 29), date(2021, 4, 11)),
    (date(2021, 7, 22), date(2021, 9, 2)),
];

static HOLIDAYS_05_NW: &[HolidaySpan] = &[
    (date(2020, 6, 29), date(2020, 8, 12)),
    (date(2020, 10, 12), date(2020, 10, 25)),
    (date(2020, 12, 23), date(2021, 1, 7)),
    (date(2021, 3, 29), date(2021, 4, 11)),
    (date(2021, 7, 5), date(2021, 8, 18)),
];

static HOLIDAYS_06_HE: &[HolidaySpan] = &[
    (date(2020, 7, 6), date(2020, 8, 15)),
    (date(2020, 10, 5), date(2020, 10, 18)),
    (date(2020, 12, 21), date(2021, 1, 10)),
    (date(2021, 4, 6), date(2021, 4, 17)),
    (date(2021, 7, 19), date(2021, 8, 28)),
];

static HOLIDAYS_07_RP: &[HolidaySpan] = &[
    (date(2020, 7, 6), date(2020, 8, 15)),
    (date(2020, 10, 12), date(2020, 10, 24)),
    (date(2020, 12, 21), date(2021, 1, 1)),
    (date(2021, 3, 29), date(2021, 4, 7)),
    (date(2021, 7, 19), date(2021, 8, 28)),
];

static HOLIDAYS_08_BW: &[HolidaySpan] = &[
    (date(2020, 7, 30), date(2020, 9, 13)),
    (date(2020, 10, 26), date(2020, 11, 1)),
    (date(2020, 12, 23), date(2021, 1, 10)),
    (date(2021, 4, 1), date(2021, 4, 11)),
    (date(2021, 5, 25), date(2021, 6, 6)),
    (date(2021, 7, 29), date(2021, 9, 12)),
];

static HOLIDAYS_09_BY: &[HolidaySpan] = &[
    (date(2020, 7, 27), date(2020, 9, 8)),
    (date(2020, 10, 31), date(2020, 11, 7)),
    (date(2020, 12, 23), date(2021, 1, 10)),
    (date(2021, 2, 15), date(2021, 2, 20)),
    (date(2021, 3, 29), date(2021, 4, 11)),
    (date(2021, 5, 25), date(2021, 6, 5)),
    (date(2021, 7, 29), date(2021, 9, 14)),
];

static HOLIDAYS_10_SL: &[HolidaySpan] = &[
    (date(2020, 7, 6), date(2020, 8, 15)),
    (date(2020, 10, 12), date(2020, 10, 24)),
    (date(2020, 12, 21), date(2021, 1, 1)),
    (date(2021, 2, 15), date(2021, 2, 20)),
    (date(2021, 3, 29), date(2021, 4, 8)),
    (date(2021, 7, 19), date(2021, 8, 28)),
];

static HOLIDAYS_11_BE: &[HolidaySpan] = &[
    (date(2020, 6, 25), date(2020, 8, 8)),
    (date(2020, 10, 12), date(2020, 10, 25)),
    (date(2020, 12, 21), date(2021, 1, 3)),
    (date(2021, 2, 1), date(2021, 2, 7)),
    (date(2021, 3, 29), date(2021, 4, 11)),
    (date(2021, 6, 24), date(2021, 8, 8)),
];

static HOLIDAYS_12_BB: &[HolidaySpan] = &[
    (date(2020, 6, 25), date(2020, 8, 9)),
    (date(2020, 10, 12), date(2020, 10, 25)),
    (date(2020, 12, 21), date(2021, 1, 3)),
    (date(2021, 2, 1), date(2021, 2, 7)),
    (date(2021, 3, 29), date(2021, 4, 10)),
    (date(2021, 6, 24), date(2021, 8, 8)),
];

static HOLIDAYS_13_MV: &[HolidaySpan] = &[
    (date(2020, 6, 22), date(2020, 8, 2)),
    (date(2020, 10, 5), date(2020, 10, 11)),
    (date(2020, 12, 21), date(2021, 1, 3)),
    (date(2021, 2, 6), date(2021, 2, 19)),
    (date(2021, 3, 29), date(2021, 4, 8)),
    (date(2021, 6, 21), date(2021, 8, 1)),
];

static HOLIDAYS_14_SN: &[HolidaySpan] = &[
    (date(2020, 7, 20), date(2020, 8, 29)),
    (date(2020, 10, 19), date(2020, 11, 1)),
    (date(2020, 12, 23), date(2021, 1, 3)),
    (date(2021, 2, 8), date(2021, 2, 21)),
    (date(2021, 4, 2), date(2021, 4, 11)),
    (date(2021, 7, 26), date(2021, 9, 4)),
];

static HOLIDAYS_15_ST: &[HolidaySpan] = &[
    (date(2020, 7, 16), date(2020, 8, 27)),
    (date(2020, 10, 19), date(2020, 10, 25)),
    (date(2020, 12, 21), date(2021, 1, 6)),
    (date(2021, 2, 8), date(2021, 2, 14)),
    (date(2021, 3, 29), date(2021, 4, 4)),
    (date(2021, 7, 22), date(2021, 9, 2)),
];

static HOLIDAYS_16_TH: &[HolidaySpan] = &[
    (date(2020, 7, 20), date(2020, 8, 30)),
    (date(2020, 10, 17), date(2020, 10, 31)),
    (date(2020, 12, 23), date(2021, 1, 3)),
    (date(2021, 2, 8), date(2021, 2, 14)),
    (date(2021, 3, 29), date(2021, 4, 11)),
    (date(2021, 7, 26), date(2021, 9, 5)),
];

/// All holiday periods of a state, sorted by start date.
///
/// An unknown state id yields an empty slice.
pub fn get_holidays(state: StateId) -> &'static [HolidaySpan] {
    match state.0 {
        1 => HOLIDAYS_01_SH,
        2 => HOLIDAYS_02_HH,
        3 => HOLIDAYS_03_NI,
        4 => HOLIDAYS_04_HB,
        5 => HOLIDAYS_05_NW,
        6 => HOLIDAYS_06_HE,
        7 => HOLIDAYS_07_RP,
        8 => HOLIDAYS_08_BW,
        9 => HOLIDAYS_09_BY,
        10 => HOLIDAYS_10_SL,
        11 => HOLIDAYS_11_BE,
        12 => HOLIDAYS_12_BB,
        13 => HOLIDAYS_13_MV,
        14 => HOLIDAYS_14_SN,
        15 => HOLIDAYS_15_ST,
        16 => HOLIDAYS_16_TH,
        _ => &[],
    }
}

/// All holiday periods of a state that overlap `[start_date, end_date)`.
///
/// Binary search over the sorted period list; O(log n).
pub fn get_holidays_in_range(
    state: StateId,
    start_date: Date,
    end_date: Date,
) -> &'static [HolidaySpan] {
    let all = get_holidays(state);
    let lower = all.partition_point(|period| period.1 < start_date);
    let upper = all.partition_point(|period| period.0 <= end_date);
    &all[lower..upper.max(lower)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn county_maps_to_state() {
        assert_eq!(get_state_id(CountyId(9162)), StateId(9)); // Munich
        assert_eq!(get_state_id(CountyId(1001)), StateId(1)); // Flensburg
        assert_eq!(get_state_id(CountyId(16077)), StateId(16));
    }

    #[test]
    fn holiday_periods_are_sorted() {
        for state in 1..=16 {
            let periods = get_holidays(StateId(state));
            assert!(!periods.is_empty());
            for pair in periods.windows(2) {
                assert!(pair[0].0 < pair[1].0, "state {state} not sorted");
            }
            for (start, end) in periods {
                assert!(start < end);
            }
        }
    }

    #[test]
    fn bavaria_autumn_2020() {
        let found = get_holidays_in_range(
            StateId(9),
            Date::new(2020, 10, 15).unwrap(),
            Date::new(2020, 11, 15).unwrap(),
        );
        assert_eq!(found, &[(date(2020, 10, 31), date(2020, 11, 7))]);
    }

    #[test]
    fn range_query_matches_linear_scan() {
        let start = date(2020, 12, 1);
        let end = date(2021, 3, 1);
        for state in 1..=16 {
            let all = get_holidays(StateId(state));
            let expected: Vec<_> = all
                .iter()
                .filter(|(s, e)| *e >= start && *s <= end)
                .copied()
                .collect();
            let found = get_holidays_in_range(StateId(state), start, end);
            assert_eq!(found, expected.as_slice(), "state {state}");
        }
    }

    #[test]
    fn empty_for_unknown_state() {
        assert!(get_holidays(StateId(0)).is_empty());
        assert!(get_holidays_in_range(StateId(42), date(2020, 1, 1), date(2021, 1, 1)).is_empty());
    }
}
