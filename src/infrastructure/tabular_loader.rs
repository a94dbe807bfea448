use crate::domain::errors::ValuationResult;
use crate::domain::vehicle::RawVehicleRecord;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Reads historical listings from a CSV file with a header row.
///
/// Unknown columns are ignored and empty cells become `None`. Rows that cannot
/// be parsed are skipped with a warning rather than failing the whole load.
pub fn load_listings(path: &Path) -> ValuationResult<Vec<RawVehicleRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let records = collect_records(reader)?;
    info!("Loaded {} listings from {:?}", records.len(), path);
    Ok(records)
}

pub fn read_listings<R: Read>(source: R) -> ValuationResult<Vec<RawVehicleRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);
    collect_records(reader)
}

fn collect_records<R: Read>(mut reader: csv::Reader<R>) -> ValuationResult<Vec<RawVehicleRecord>> {
    // Fail early on an unreadable header rather than skipping every row
    reader.headers()?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.deserialize::<RawVehicleRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(row = line + 1, "Skipping unparseable listing: {}", e);
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, kept = records.len(), "Some listings could not be parsed");
    }
    Ok(records)
}
