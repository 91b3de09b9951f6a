//! Event Module
//!
//! Event slots that external code fires to start workflows, and the
//! catalog type used to declare them.
//!
//! - [`bus`]: Ordered, snapshot-dispatching subscriber list

use std::collections::BTreeMap;

pub mod bus;

pub use bus::{handler, EventBus, Handler, HandlerFuture};

/// Declarative event catalog: group name -> event name -> event id.
pub type EventCatalog = BTreeMap<String, BTreeMap<String, String>>;

/// Flattens a catalog into its event ids.
pub fn catalog_ids(catalog: &EventCatalog) -> impl Iterator<Item = &str> {
    catalog
        .values()
        .flat_map(|group| group.values())
        .map(String::as_str)
}
