//! Multi-network Safe ownership lookup against the Safe transaction service.

pub mod address;
pub mod address_book;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod lookup;
pub mod models;
pub mod networks;

pub use address::normalize_address;
pub use address_book::{AddressBook, AddressBookEntry};
pub use config::Config;
pub use error::{AppError, FetchError, Result};
pub use fetcher::RetryingFetcher;
pub use lookup::{NetworkOutcome, SafeLookup};
pub use networks::NetworkDescriptor;
