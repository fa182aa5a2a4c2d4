mod record;

use proc_macro::TokenStream;

/// Derive macro that implements `progress_ledger::Record`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Clone, Record)]
/// #[record(collection = "progress_records")]
/// struct ProgressRecord {
///     #[record(key)]
///     pub user_id: String,
///     #[record(key)]
///     pub lesson_id: String,
///     pub watch_time: f64,
/// }
/// ```
///
/// Key fields are joined with `:` in declaration order, so the record above
/// is stored under `"<user_id>:<lesson_id>"`. Each component has `\` and `:`
/// backslash-escaped first (`progress_ledger::record::composite_key`). Without any `#[record(key)]`
/// field, a field named `id` is used. The collection defaults to the
/// snake_case struct name with an `s` suffix.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
