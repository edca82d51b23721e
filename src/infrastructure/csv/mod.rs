// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV exports of leads

mod lead_writer;

pub use lead_writer::{export_file_name, LeadCsvWriter};
