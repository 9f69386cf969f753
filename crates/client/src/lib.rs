pub mod api;
pub mod config;
pub mod store;
pub mod sync;
pub mod transport;

pub use api::ClientApi;
pub use store::LocalStore;
pub use sync::{CancelToken, Reconciler};
pub use transport::{HttpTransport, ServerTransport};
