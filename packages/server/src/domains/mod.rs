// Business domains
pub mod downloads;
pub mod scraping;
