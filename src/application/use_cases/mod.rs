pub mod enrichment;
pub mod lead_search;
pub mod ods_export;
pub mod private_clinics;
pub mod saved_leads;
pub mod scraped_leads;
pub mod sitemap_scraper;

#[cfg(test)]
pub(crate) mod fakes;
