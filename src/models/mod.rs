pub mod candidate;
pub mod job;
pub mod listing;
pub mod price;
pub mod product;
pub mod query;
