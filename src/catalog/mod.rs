mod columns;
mod descriptor;
mod filter;
mod order;
mod page;
mod params;
mod process;
mod query;

pub use page::ResultPage;
pub use params::QueryParams;
pub use process::Catalog;
