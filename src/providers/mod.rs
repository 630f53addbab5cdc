pub mod dashboard_api;
pub mod upbit;
pub mod util;
pub mod yahoo_finance;
