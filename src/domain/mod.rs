pub mod enrichment;
pub mod error;
pub mod lead;
pub mod saved_lead;
pub mod scraped;
pub mod user;
