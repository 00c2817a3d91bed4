use proc_macro::TokenStream;

mod entity;
mod record;

/// Field shape, slot access and nested value conversion for a struct with
/// named fields. Fields are tagged with `#[loquat("Name,option,...")]`; a
/// field tagged `-` is left out entirely and only needs `Default`.
#[proc_macro_derive(Record, attributes(loquat))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input.into()).into()
}

/// Binds a record to its kind name: `#[loquat(name = "User", hooks)]`.
/// The name defaults to the type name; `hooks` binds the type's
/// `RecordHooks` impl.
#[proc_macro_derive(Entity, attributes(loquat))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
