use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Demographic and administrative attributes of a patient.
///
/// Every attribute besides the id may be missing in the source table; absent
/// values stay `None` and are left out of the rendered profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub ssn: Option<String>,
    pub drivers: Option<String>,
    pub passport: Option<String>,
    pub prefix: Option<String>,
    pub first: Option<String>,
    pub middle: Option<String>,
    pub last: Option<String>,
    pub suffix: Option<String>,
    pub maiden: Option<String>,
    pub marital: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
    pub gender: Option<String>,
    pub birthplace: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub fips: Option<String>,
    pub zip: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub healthcare_expenses: Option<f64>,
    pub healthcare_coverage: Option<f64>,
    pub income: Option<f64>,
}

impl Patient {
    /// Display name assembled from whichever name parts are recorded.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.prefix, &self.first, &self.middle, &self.last, &self.suffix]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Age in whole years at `on`, or at death if that came first.
    pub fn age_at(&self, on: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let reference = match self.death_date {
            Some(death) if death < on => death,
            _ => on,
        };
        reference.years_since(birth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::patient;

    #[test]
    fn display_name_skips_missing_parts() {
        let mut p = patient("P1");
        p.prefix = Some("Mrs.".into());
        p.first = Some("Jane".into());
        p.middle = None;
        p.last = Some("Doe".into());
        assert_eq!(p.display_name().as_deref(), Some("Mrs. Jane Doe"));
    }

    #[test]
    fn display_name_none_without_parts() {
        let mut p = patient("P1");
        p.prefix = None;
        p.first = None;
        p.middle = Some("  ".into());
        p.last = None;
        p.suffix = None;
        assert_eq!(p.display_name(), None);
    }

    #[test]
    fn age_counts_completed_years() {
        let mut p = patient("P1");
        p.birth_date = NaiveDate::from_ymd_opt(1980, 6, 15);
        assert_eq!(p.age_at(NaiveDate::from_ymd_opt(2020, 6, 14).unwrap()), Some(39));
        assert_eq!(p.age_at(NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()), Some(40));
    }

    #[test]
    fn age_stops_at_death() {
        let mut p = patient("P1");
        p.birth_date = NaiveDate::from_ymd_opt(1950, 1, 1);
        p.death_date = NaiveDate::from_ymd_opt(2000, 1, 1);
        assert_eq!(p.age_at(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()), Some(50));
    }
}
