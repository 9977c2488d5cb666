// Dashboard domain model - Chart-ready projections of the port series
use super::sample::{Measurement, Sample};
use super::series::PortSeriesStore;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One index-aligned row of a series table.
///
/// Serialises as `{ "index": i, "<port>": value, ... }`. Validation keeps
/// ports from being named `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub index: usize,
    pub values: Vec<(String, f64)>,
}

impl SeriesRow {
    pub fn value(&self, port: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(p, _)| p == port)
            .map(|(_, v)| *v)
    }
}

impl Serialize for SeriesRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("index", &self.index)?;
        for (port, value) in &self.values {
            map.serialize_entry(port, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub measurement: Measurement,
    pub rows: Vec<SeriesRow>,
}

/// Full snapshot handed to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub interval_secs: u64,
    pub open_ports: Vec<String>,
    pub latest_data: Vec<Sample>,
    pub tables: Vec<SeriesTable>,
}

impl Dashboard {
    pub fn new(store: &PortSeriesStore, interval_secs: u64) -> Self {
        Self {
            interval_secs,
            open_ports: open_ports(store),
            latest_data: latest_per_port(store),
            tables: Measurement::ALL
                .into_iter()
                .map(|m| series_table(store, m))
                .collect(),
        }
    }

    pub fn table(&self, measurement: Measurement) -> Option<&SeriesTable> {
        self.tables.iter().find(|t| t.measurement == measurement)
    }
}

pub fn open_ports(store: &PortSeriesStore) -> Vec<String> {
    store.ports().to_vec()
}

/// Most recent sample of every port; ports with an empty series are skipped.
pub fn latest_per_port(store: &PortSeriesStore) -> Vec<Sample> {
    store
        .iter()
        .filter_map(|(_, series)| series.back().cloned())
        .collect()
}

/// Align every port's series by position and convert to display units.
///
/// Row `i` carries a column for each port whose series has an element at `i`.
/// Rows are aligned by index, not by timestamp.
pub fn series_table(store: &PortSeriesStore, measurement: Measurement) -> SeriesTable {
    let depth = store
        .iter()
        .map(|(_, series)| series.len())
        .max()
        .unwrap_or(0);

    let rows = (0..depth)
        .map(|index| SeriesRow {
            index,
            values: store
                .iter()
                .filter_map(|(port, series)| {
                    let sample = series.get(index)?;
                    let value = Measurement::to_display(sample.measurement(measurement));
                    Some((port.to_string(), value))
                })
                .collect(),
        })
        .collect();

    SeriesTable { measurement, rows }
}
