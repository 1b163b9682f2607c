pub mod news;
pub mod price;
pub mod types;
