//! Loading transactions from, and saving labeled transactions to, delimited text

use crate::error::{Error, Result};
use crate::record::{parse_date, Record};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// One row as it appears in the export, before the date is parsed
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Type")]
    spend_type: String,
    #[serde(rename = "Details", default)]
    location: String,
    #[serde(rename = "Particulars", default)]
    particulars: String,
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Reference", default)]
    reference: Option<String>,
    #[serde(rename = "Amount")]
    quantity: f64,
    #[serde(rename = "ForeignCurrencyAmount", default)]
    foreign_amount: Option<f64>,
    #[serde(rename = "ConversionCharge", default)]
    conversion_charge: Option<f64>,
    #[serde(rename = "classification", default)]
    classification: Option<String>,
}

impl TryFrom<RawRecord> for Record {
    type Error = Error;

    fn try_from(raw: RawRecord) -> Result<Self> {
        Ok(Record {
            date: parse_date(&raw.date)?,
            spend_type: raw.spend_type,
            location: raw.location,
            particulars: raw.particulars,
            code: raw.code,
            reference: raw.reference,
            quantity: raw.quantity,
            foreign_amount: raw.foreign_amount,
            conversion_charge: raw.conversion_charge,
            classification: raw.classification,
        })
    }
}

/// Load every record from a bank CSV export.
///
/// Only `.csv` files are accepted. Column presence and date parsing are
/// checked here; categorical values are taken as they come.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)?;
    let records = read_records(file)?;
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read records from any CSV source with a header row.
///
/// Malformed rows fail as [`Error::Csv`]; a well-formed row with an
/// unreadable date fails as [`Error::InvalidData`] naming its line.
pub fn read_records<R: std::io::Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<RawRecord>().enumerate() {
        let record = Record::try_from(row?).map_err(|e| match e {
            Error::InvalidData { message } => Error::invalid_data(format!("line {}: {}", i + 2, message)),
            other => other,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write records, including their classification column, to `path`.
///
/// An existing file is left untouched unless `overwrite` is set; callers
/// are expected to ask the user before passing `true`.
pub fn save_records(path: impl AsRef<Path>, records: &[Record], overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !overwrite {
        return Err(Error::FileExists {
            path: path.to_path_buf(),
        });
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    log::info!("saved {} records to {}", records.len(), path.display());
    Ok(())
}
