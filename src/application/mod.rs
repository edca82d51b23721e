pub mod use_cases;

pub use use_cases::enrichment::EnrichmentUseCase;
pub use use_cases::lead_search::LeadSearchUseCase;
pub use use_cases::ods_export::OdsExportUseCase;
pub use use_cases::private_clinics::PrivateClinicsUseCase;
pub use use_cases::saved_leads::SavedLeadsUseCase;
pub use use_cases::scraped_leads::ScrapedLeadsUseCase;
pub use use_cases::sitemap_scraper::SitemapScraperUseCase;
