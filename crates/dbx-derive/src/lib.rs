//! Derive macros for dbx
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;

/// Derive `Entity` (field declarations and capabilities) for a struct.
///
/// # Example
///
/// ```ignore
/// use dbx::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "orders", enums = "order_enums", rename_all = "camelCase")]
/// struct Order {
///     #[orm(display = "ID")]
///     id: i64,
///     #[orm(display = "Customer")]
///     customer_id: i64,
///     #[orm(reference = "customerId")]
///     customer_name: String,
///     #[orm(display = "Status")]
///     status: dbx::Enum,
///     #[orm(virtual, display = "Total")]
///     total: dbx::Money,
///     #[orm(skip)]
///     internal_note: Option<String>,
/// }
///
/// fn order_enums() -> Vec<dbx::EnumDefinition> {
///     vec![dbx::EnumDefinition::new("status", "order_status").value("N", "New")]
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(table = "name")]` - Default FROM table
/// - `#[orm(enums = "path::to::fn")]` - Function returning the enum dictionaries
/// - `#[orm(rename_all = "camelCase")]` - Case convention for implicit external names
///   (`camelCase`, `PascalCase`, `snake_case`, `kebab-case`)
///
/// Field level:
/// - `#[orm(name = "...")]` - External name (defaults to the field name)
/// - `#[orm(column = "...")]` - Storage column (defaults to the field name)
/// - `#[orm(reference = "...")]` - External name of another declared field. Filters on
///   this field resolve to that field's column and type, and header entries report it
///   as `reference`. Naming an undeclared field makes filters on this one fail with
///   "unknown filter field"
/// - `#[orm(display = "...")]` - Display name; only displayed fields appear in headers
/// - `#[orm(virtual)]` - No storage column
/// - `#[orm(skip)]` - No external name (hidden from filters and headers)
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use dbx::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     #[orm(column = "email_address")]
///     email: Option<String>,
///     #[orm(virtual)]
///     display_name: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(virtual)]` - Not read from the row; filled with `Default::default()`
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
