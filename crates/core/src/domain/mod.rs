pub mod explanation;
pub mod news;
pub mod price;
pub mod query;
