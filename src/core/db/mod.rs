/// Database Module
///
/// This module provides the core database functionality for sqlpeek,
/// organized into focused submodules for better maintainability and
/// separation of concerns.
///
/// ## Architecture
///
/// The database layer is split into three main concerns:
/// - **Connection Management** (`connection.rs`): The immutable database
///   handle and scoped per-operation connections
/// - **Schema Catalog** (`catalog.rs`): Table/view inventory with ordered
///   column lists, plus the stable-order table row fetch
/// - **Query Execution** (`query.rs`): Ad-hoc SQL execution with keyword
///   classification and uniform result packaging
///
/// ## Error Handling
///
/// Catalog and connection operations use the standardized `SqlpeekError`
/// type. Query execution deliberately absorbs engine failures into its
/// result shape instead (see `query::run_query`).
pub mod catalog;
pub mod connection;
pub mod query;

pub use catalog::*;
pub use connection::*;
pub use query::*;
