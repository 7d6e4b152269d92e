use std::collections::HashMap;

use time::PrimitiveDateTime;

use super::Building;

/// Registry of every building seen during a run.
///
/// Buildings are created on first use and iterate in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Campus {
    buildings: Vec<Building>,
    index: HashMap<String, usize>,
}

impl Campus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the building called `name`, creating it if absent.
    pub fn ensure_building(&mut self, name: &str) -> &mut Building {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.buildings.push(Building::new(name));
                let idx = self.buildings.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.buildings[idx]
    }

    pub fn add_reading(&mut self, name: &str, ts: PrimitiveDateTime, kwh: f64) {
        self.ensure_building(name).add(ts, kwh);
    }

    pub fn get(&self, name: &str) -> Option<&Building> {
        self.index.get(name).map(|&idx| &self.buildings[idx])
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn campus_total(&self) -> f64 {
        self.buildings.iter().fold(0.0, |acc, b| acc + b.total())
    }

    /// Building with the largest total.
    ///
    /// A later building only takes the lead when strictly greater, so ties go
    /// to whichever building was registered first.
    pub fn highest_consumer(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for b in &self.buildings {
            let total = b.total();
            match best {
                Some((_, top)) if total <= top => {}
                _ => best = Some((b.name(), total)),
            }
        }
        best
    }
}
