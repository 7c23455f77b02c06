//! Server Registry - local mirror of the panel's server list
//!
//! ## Responsibilities
//!
//! - Persist one `server_{n}` section per remote server (`id`, `name`, `hide`)
//! - Keep local keys stable: a key maps to one remote id for its lifetime
//! - Reconcile against the panel (delete gone, rename changed, insert new)
//! - Lookups for command handlers (by id or name, hidden flag)
//!
//! ## Module layout
//!
//! - `types`: records, reports and key helpers
//! - `repository`: reads over the ConfigStore
//! - `plan`: pure diff producing a batch of store mutations
//! - `sync_service`: fetch, plan, apply, save; periodic scheduling
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = ServerRegistry::new(store.clone());
//! let reconciler = Arc::new(RegistryReconciler::new(Arc::new(client), registry));
//! let report = reconciler.reconcile().await?;
//! ```

mod plan;
mod repository;
mod sync_service;
mod types;

pub use plan::ReconcilePlan;
pub use repository::ServerRegistry;
pub use sync_service::{
    RegistryReconciler, RemoteServerSource, DEFAULT_SYNC_INTERVAL, MIN_SYNC_INTERVAL,
};
pub use types::*;
