//! Columnar event table with a typed, load-time-resolved schema.
//!
//! One row per event, two generated objects per row. Column positions are
//! resolved once when the table is built; a missing column is a fatal
//! schema mismatch, never a per-row skip.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use roical_core::{Error, Result, SignalRegion};

/// Index of one generated object within an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectIndex {
    /// First generated object (`genen1`, ...).
    First,
    /// Second generated object (`genen2`, ...).
    Second,
}

impl ObjectIndex {
    /// Both objects, in column order.
    pub const BOTH: [ObjectIndex; 2] = [ObjectIndex::First, ObjectIndex::Second];

    fn tag(self) -> usize {
        match self {
            ObjectIndex::First => 1,
            ObjectIndex::Second => 2,
        }
    }

    fn slot(self) -> usize {
        self.tag() - 1
    }
}

/// Column positions resolved at load time.
#[derive(Debug, Clone)]
struct Schema {
    gen_energy: [usize; 2],
    gen_eta: [usize; 2],
    gen_phi: [usize; 2],
    rec_energy: [[usize; 3]; 2],
    reference_noise: [usize; 2],
}

/// Flat per-event table consumed from the ROI summarization collaborator.
#[derive(Debug, Clone)]
pub struct EventTable {
    columns: Vec<Vec<f64>>,
    schema: Schema,
    n_events: usize,
}

impl EventTable {
    /// Build a table from named columns, resolving the schema once.
    ///
    /// Required columns: `genen{1,2}`, `geneta{1,2}`, `genphi{1,2}`,
    /// `en{i}_{r}` for objects 1..2 and regions 1..3, and `noise{i}_3`
    /// (noise measured at the reference region). All columns must have the
    /// same length.
    pub fn from_columns(columns: HashMap<String, Vec<f64>>) -> Result<Self> {
        let mut names: Vec<&String> = columns.keys().collect();
        names.sort();

        let index_of: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        let require = |name: String| -> Result<usize> {
            index_of
                .get(name.as_str())
                .copied()
                .ok_or(Error::SchemaMismatch { column: name })
        };

        let mut gen_energy = [0usize; 2];
        let mut gen_eta = [0usize; 2];
        let mut gen_phi = [0usize; 2];
        let mut rec_energy = [[0usize; 3]; 2];
        let mut reference_noise = [0usize; 2];

        for obj in ObjectIndex::BOTH {
            let (tag, slot) = (obj.tag(), obj.slot());
            gen_energy[slot] = require(format!("genen{tag}"))?;
            gen_eta[slot] = require(format!("geneta{tag}"))?;
            gen_phi[slot] = require(format!("genphi{tag}"))?;
            for region in SignalRegion::ALL {
                rec_energy[slot][region.index() - 1] =
                    require(format!("en{tag}_{}", region.index()))?;
            }
            reference_noise[slot] =
                require(format!("noise{tag}_{}", SignalRegion::NOISE_REFERENCE.index()))?;
        }

        let ordered: Vec<Vec<f64>> = names.iter().map(|n| columns[n.as_str()].clone()).collect();

        let n_events = ordered.first().map(|c| c.len()).unwrap_or(0);
        for (name, col) in names.iter().zip(&ordered) {
            if col.len() != n_events {
                return Err(Error::Validation(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    col.len(),
                    n_events
                )));
            }
        }

        Ok(Self {
            columns: ordered,
            schema: Schema { gen_energy, gen_eta, gen_phi, rec_energy, reference_noise },
            n_events,
        })
    }

    /// Load a table from a JSON file mapping column names to arrays.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let columns: HashMap<String, Vec<f64>> = serde_json::from_reader(reader)?;
        Self::from_columns(columns)
    }

    /// Number of events (rows).
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Generated energy [GeV].
    pub fn gen_energy(&self, event: usize, obj: ObjectIndex) -> f64 {
        self.columns[self.schema.gen_energy[obj.slot()]][event]
    }

    /// Generated eta (signed).
    pub fn gen_eta(&self, event: usize, obj: ObjectIndex) -> f64 {
        self.columns[self.schema.gen_eta[obj.slot()]][event]
    }

    /// Generated phi [rad].
    pub fn gen_phi(&self, event: usize, obj: ObjectIndex) -> f64 {
        self.columns[self.schema.gen_phi[obj.slot()]][event]
    }

    /// Reconstructed energy in one signal region [GeV].
    pub fn rec_energy(&self, event: usize, obj: ObjectIndex, region: SignalRegion) -> f64 {
        self.columns[self.schema.rec_energy[obj.slot()][region.index() - 1]][event]
    }

    /// Average noise measured at the reference region [GeV].
    pub fn reference_noise(&self, event: usize, obj: ObjectIndex) -> f64 {
        self.columns[self.schema.reference_noise[obj.slot()]][event]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn column_names() -> Vec<String> {
        let mut names = Vec::new();
        for tag in 1..=2 {
            names.push(format!("genen{tag}"));
            names.push(format!("geneta{tag}"));
            names.push(format!("genphi{tag}"));
            for r in 1..=3 {
                names.push(format!("en{tag}_{r}"));
            }
            names.push(format!("noise{tag}_3"));
        }
        names
    }

    fn zero_table(n: usize) -> HashMap<String, Vec<f64>> {
        column_names().into_iter().map(|n2| (n2, vec![0.0; n])).collect()
    }

    #[test]
    fn resolves_schema_and_reads_cells() {
        let mut cols = zero_table(3);
        cols.insert("genen1".into(), vec![100.0, 150.0, 200.0]);
        cols.insert("en2_3".into(), vec![1.0, 2.0, 3.0]);
        cols.insert("noise1_3".into(), vec![5.0, 6.0, 7.0]);

        let t = EventTable::from_columns(cols).unwrap();
        assert_eq!(t.n_events(), 3);
        assert_eq!(t.gen_energy(1, ObjectIndex::First), 150.0);
        assert_eq!(t.rec_energy(2, ObjectIndex::Second, SignalRegion::Sr3), 3.0);
        assert_eq!(t.reference_noise(0, ObjectIndex::First), 5.0);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let mut cols = zero_table(2);
        cols.remove("en1_2");
        let err = EventTable::from_columns(cols).unwrap_err();
        match err {
            Error::SchemaMismatch { column } => assert_eq!(column, "en1_2"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn ragged_columns_rejected() {
        let mut cols = zero_table(2);
        cols.insert("geneta2".into(), vec![0.0; 3]);
        assert!(EventTable::from_columns(cols).is_err());
    }
}
