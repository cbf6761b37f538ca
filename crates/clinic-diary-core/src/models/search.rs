//! Search criteria and the store query built from them.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::appointment::AppointmentFields;

/// Filters entered in the search form. Blank strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub registration_number: Option<String>,
    /// Case-insensitive substring of the patient name
    pub patient_name: Option<String>,
}

impl SearchCriteria {
    /// Build the store query.
    ///
    /// The date range only applies when both bounds are given. Bounds are
    /// whole days in `offset`: the start is midnight of `date_from`, the end is
    /// 23:59:59.999 of `date_to`.
    pub fn to_query(&self, offset: FixedOffset) -> ActiveQuery {
        let appointment_range = match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => day_bounds(from, to, offset),
            _ => None,
        };

        ActiveQuery {
            registration_number: non_blank(&self.registration_number),
            appointment_range,
            name_contains: non_blank(&self.patient_name),
        }
    }
}

/// A query against the active collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveQuery {
    /// Exact registration number
    pub registration_number: Option<String>,
    /// Inclusive appointment date range
    pub appointment_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Case-insensitive substring of the patient name
    pub name_contains: Option<String>,
}

impl ActiveQuery {
    /// Query matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Check the name filter. Registration number and date range are
    /// applied by the store.
    pub fn matches_name(&self, fields: &AppointmentFields) -> bool {
        match &self.name_contains {
            Some(needle) => fields
                .patient_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

fn day_bounds(
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = offset
        .from_local_datetime(&from.and_hms_milli_opt(0, 0, 0, 0)?)
        .single()?;
    let end = offset
        .from_local_datetime(&to.and_hms_milli_opt(23, 59, 59, 999)?)
        .single()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_day_is_inclusive() {
        let criteria = SearchCriteria {
            date_from: Some(date(2024, 3, 1)),
            date_to: Some(date(2024, 3, 5)),
            ..Default::default()
        };
        let (start, end) = criteria.to_query(Utc.fix()).appointment_range.unwrap();

        let late = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(late <= end);
        assert!(next_day > end);
    }

    #[test]
    fn test_range_respects_offset() {
        let criteria = SearchCriteria {
            date_from: Some(date(2024, 3, 5)),
            date_to: Some(date(2024, 3, 5)),
            ..Default::default()
        };
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let (start, end) = criteria.to_query(ist).appointment_range.unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 4, 18, 30, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 3, 5, 18, 29, 59).unwrap() + chrono::Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_single_bound_is_ignored() {
        let criteria = SearchCriteria {
            date_from: Some(date(2024, 3, 1)),
            ..Default::default()
        };
        assert_eq!(criteria.to_query(Utc.fix()).appointment_range, None);
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let criteria = SearchCriteria {
            registration_number: Some("  ".into()),
            patient_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(criteria.to_query(Utc.fix()), ActiveQuery::all());
    }

    #[test]
    fn test_name_match_is_case_insensitive_substring() {
        let query = ActiveQuery {
            name_contains: Some("asha".into()),
            ..Default::default()
        };
        assert!(query.matches_name(&AppointmentFields::new("R1".into(), "Asha Rao".into())));
        assert!(query.matches_name(&AppointmentFields::new("R2".into(), "Raj Asha".into())));
        assert!(!query.matches_name(&AppointmentFields::new("R3".into(), "Ravi".into())));
    }
}
