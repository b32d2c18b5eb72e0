// ── Incident list store ──
//
// Holds the last fetched incident list. The list is only ever replaced
// wholesale by a fetch; push events never patch it.

mod list_store;

pub use list_store::{ListState, ListStore, Snapshot};
