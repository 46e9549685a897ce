//! Board item access: the platform client, the column ↔ field mapping, the
//! mutation builder and the item store.
//!
//! ```text
//! card ──read──> fields (FieldMapper) ──> DisplayField
//!   │
//!   └─save──> query (ColumnValuePatch) ──> store (ItemStore) ──> api (PlatformApi)
//! ```

pub mod api;
pub mod fields;
pub mod models;
pub mod query;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiResponse, MondayClient, PlatformApi};
pub use fields::{ColumnType, DisplayField, FieldMap, FieldMapper, FieldMapping};
pub use models::{Asset, ColumnEntry, FileRef, Item};
pub use query::{ColumnKind, ColumnPatch, ColumnValuePatch, StatusLabel};
pub use store::ItemStore;
