use time::PrimitiveDateTime;

use super::Reading;

/// A named consumer accumulating readings in arrival order.
///
/// All statistics fall back to `0.0` when the building has no readings.
/// Use [`Building::is_empty`] to tell "no data" apart from "zero usage".
#[derive(Debug, Clone)]
pub struct Building {
    name: String,
    readings: Vec<Reading>,
}

impl Building {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            readings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Appends a reading. Values are stored as given; range checks belong
    /// to the ingestion layer.
    pub fn add(&mut self, ts: PrimitiveDateTime, kwh: f64) {
        self.readings.push(Reading::new(ts, kwh));
    }

    pub fn total(&self) -> f64 {
        // Seeded with +0.0: float `Sum` starts at -0.0, which prints as "-0.00".
        self.readings.iter().fold(0.0, |acc, r| acc + r.kwh)
    }

    pub fn average(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.total() / self.readings.len() as f64
    }

    pub fn minimum(&self) -> f64 {
        self.readings
            .iter()
            .map(|r| r.kwh)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    pub fn maximum(&self) -> f64 {
        self.readings
            .iter()
            .map(|r| r.kwh)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Multi-line report block used by the executive summary.
    pub fn report(&self) -> String {
        format!(
            "\nREPORT: {}\n • Entries: {}\n • Total: {:.2} kWh\n • Average: {:.2} kWh\n • Min: {:.2} kWh\n • Max: {:.2} kWh\n",
            self.name,
            self.readings.len(),
            self.total(),
            self.average(),
            self.minimum(),
            self.maximum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn building_with(values: &[f64]) -> Building {
        let mut b = Building::new("Library");
        for (i, v) in values.iter().enumerate() {
            b.add(datetime!(2024-01-01 00:00:00) + time::Duration::hours(i as i64), *v);
        }
        b
    }

    #[test]
    fn empty_building_reports_zero_for_every_statistic() {
        let b = Building::new("Empty");
        assert!(b.is_empty());
        assert_eq!(b.total(), 0.0);
        assert_eq!(b.average(), 0.0);
        assert_eq!(b.minimum(), 0.0);
        assert_eq!(b.maximum(), 0.0);
    }

    #[test]
    fn average_is_total_over_count() {
        let b = building_with(&[3.0, 4.5, 10.0, 0.25]);
        assert_eq!(b.len(), 4);
        assert_eq!(b.average(), b.total() / 4.0);
        assert_eq!(b.minimum(), 0.25);
        assert_eq!(b.maximum(), 10.0);
    }

    #[test]
    fn readings_keep_insertion_order() {
        let b = building_with(&[5.0, 1.0, 3.0]);
        let values: Vec<f64> = b.readings().iter().map(|r| r.kwh).collect();
        assert_eq!(values, vec![5.0, 1.0, 3.0]);
    }

    #[test]
    fn report_rounds_to_two_decimals() {
        let b = building_with(&[10.0, 20.0, 0.333]);
        let expected = "\nREPORT: Library\n • Entries: 3\n • Total: 30.33 kWh\n • Average: 10.11 kWh\n • Min: 0.33 kWh\n • Max: 20.00 kWh\n";
        assert_eq!(b.report(), expected);
    }

    #[test]
    fn report_of_empty_building_shows_zeros() {
        let report = Building::new("Gym").report();
        assert!(report.contains(" • Entries: 0\n"));
        assert!(report.contains(" • Total: 0.00 kWh\n"));
        assert!(report.contains(" • Min: 0.00 kWh\n"));
    }
}
