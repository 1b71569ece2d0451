pub mod catalog;
pub mod identity;

pub use catalog::CatalogStore;
pub use identity::IdentityClient;
