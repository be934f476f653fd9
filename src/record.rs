//! Transaction records as exported by the bank

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Date layouts accepted on input, day-first forms tried before ISO ones
pub const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Layout used when writing dates back out
pub const OUTPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// One bank transaction.
///
/// Field names on the wire follow the bank's CSV export. Everything except
/// `classification` is fixed once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Transaction date
    #[serde(rename = "Date", serialize_with = "serialize_date")]
    pub date: NaiveDate,
    /// Kind of transaction (e.g. "Visa Purchase", "Transfer")
    #[serde(rename = "Type")]
    pub spend_type: String,
    /// Merchant or counterparty
    #[serde(rename = "Details")]
    pub location: String,
    /// Free-text particulars
    #[serde(rename = "Particulars")]
    pub particulars: String,
    /// Bank code
    #[serde(rename = "Code")]
    pub code: Option<String>,
    /// Payment reference
    #[serde(rename = "Reference")]
    pub reference: Option<String>,
    /// Signed amount, negative for money leaving the account
    #[serde(rename = "Amount")]
    pub quantity: f64,
    /// Amount in the original currency
    #[serde(rename = "ForeignCurrencyAmount")]
    pub foreign_amount: Option<f64>,
    /// Fee charged for currency conversion
    #[serde(rename = "ConversionCharge")]
    pub conversion_charge: Option<f64>,
    /// Category label bound during reconciliation
    #[serde(rename = "classification")]
    pub classification: Option<String>,
}

impl Record {
    /// Create a record with the clustering-relevant fields and no metadata
    pub fn new(
        date: NaiveDate,
        spend_type: impl Into<String>,
        location: impl Into<String>,
        particulars: impl Into<String>,
        quantity: f64,
    ) -> Self {
        Self {
            date,
            spend_type: spend_type.into(),
            location: location.into(),
            particulars: particulars.into(),
            code: None,
            reference: None,
            quantity,
            foreign_amount: None,
            conversion_charge: None,
            classification: None,
        }
    }

    /// Value of one categorical attribute
    pub fn attribute(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::SpendType => &self.spend_type,
            Attribute::Location => &self.location,
            Attribute::Particulars => &self.particulars,
        }
    }

    /// Copy of this record carrying the given label
    pub fn with_classification(&self, label: impl Into<String>) -> Self {
        Self {
            classification: Some(label.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:<16} {:<24} {:<16} {:>10.2}",
            self.date.format(OUTPUT_DATE_FORMAT),
            self.spend_type,
            self.location,
            self.particulars,
            self.quantity
        )
    }
}

/// Categorical attributes that take part in clustering, in encoding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    /// Transaction type
    SpendType,
    /// Merchant or counterparty
    Location,
    /// Free-text particulars
    Particulars,
}

impl Attribute {
    /// All clustering attributes in column order
    pub const ALL: [Attribute; 3] = [Attribute::SpendType, Attribute::Location, Attribute::Particulars];

    /// Column header in the bank export
    pub fn header(&self) -> &'static str {
        match self {
            Attribute::SpendType => "Type",
            Attribute::Location => "Details",
            Attribute::Particulars => "Particulars",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Parse a date in any of [`DATE_FORMATS`]
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| Error::invalid_data(format!("Unrecognised date '{}'", text)))
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format(OUTPUT_DATE_FORMAT).to_string())
}
