pub mod caching;
pub mod yahoo_finance;

pub use caching::CachingCompanyProvider;
pub use yahoo_finance::YahooFinanceProvider;
