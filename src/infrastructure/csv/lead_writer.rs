// ============================================================
// LEAD CSV WRITER
// ============================================================
// Fixed-column CSV for saved-lead exports and ODS role dumps

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use csv::{QuoteStyle, WriterBuilder};

use crate::domain::error::{AppError, Result};
use crate::domain::lead::Lead;
use crate::domain::saved_lead::SavedLead;

/// Columns of a saved-lead export, in order.
pub const SAVED_LEAD_COLUMNS: [&str; 15] = [
    "Name",
    "ODS_Code",
    "Status",
    "Address",
    "City",
    "Postcode",
    "Country",
    "Role",
    "Type",
    "PhoneNumber",
    "Email",
    "Website",
    "FullAddress",
    "Notes",
    "SavedAt",
];

/// Columns of an ODS role export, in order.
pub const ODS_EXPORT_COLUMNS: [&str; 8] = [
    "Name", "ODS_Code", "Status", "Address", "City", "Postcode", "Country", "Role",
];

pub fn export_file_name(date: NaiveDate) -> String {
    format!("my_saved_leads_{}.csv", date.format("%Y-%m-%d"))
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn ods_record(lead: &Lead) -> [&str; 8] {
    [
        lead.name.as_str(),
        lead.ods_code.as_str(),
        lead.status.as_str(),
        text(&lead.address),
        text(&lead.city),
        text(&lead.postcode),
        lead.country.as_str(),
        text(&lead.role),
    ]
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// RFC 4180 writer; fields are quoted only when they need it.
pub struct LeadCsvWriter {
    delimiter: u8,
}

impl Default for LeadCsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl LeadCsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary);
        builder
    }

    pub fn write_saved<W: Write>(&self, out: W, leads: &[SavedLead]) -> Result<()> {
        let mut writer = self.builder().from_writer(out);
        writer.write_record(SAVED_LEAD_COLUMNS).map_err(csv_error)?;

        for saved in leads {
            let lead = &saved.lead;
            let saved_at = timestamp(&saved.saved_at);
            let mut record: Vec<&str> = Vec::with_capacity(SAVED_LEAD_COLUMNS.len());
            record.extend_from_slice(&ods_record(lead));
            record.push(lead.lead_type.as_str());
            record.push(text(&lead.phone_number));
            record.push(text(&lead.email));
            record.push(text(&lead.website));
            record.push(text(&lead.full_address));
            record.push(text(&saved.notes));
            record.push(&saved_at);
            writer.write_record(&record).map_err(csv_error)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn saved_to_string(&self, leads: &[SavedLead]) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_saved(&mut buffer, leads)?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::Internal(format!("CSV output is not UTF-8: {}", e)))
    }

    pub fn write_ods<W: Write>(&self, out: W, leads: &[Lead]) -> Result<()> {
        let mut writer = self.builder().from_writer(out);
        writer.write_record(ODS_EXPORT_COLUMNS).map_err(csv_error)?;
        for lead in leads {
            writer.write_record(ods_record(lead)).map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("Failed to write CSV: {}", e))
}
