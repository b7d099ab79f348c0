//! Core business logic abstractions

pub mod cache;
pub mod company;
pub mod config;
pub mod format;
pub mod growth;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use company::{CompanyData, CompanyDataProvider, CompanyProfile, EarningsEvent, ViewMode};
pub use growth::{GrowthBadges, Horizon};
