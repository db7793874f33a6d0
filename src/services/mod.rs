pub mod accounts;
pub mod export;
pub mod income;
pub mod media;
pub mod paye;
pub mod schedule;
pub mod tax_record;
