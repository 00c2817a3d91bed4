use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, LitStr};

// derive_record
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> Result<TokenStream, Error> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            ident,
            "Record can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Record can only be derived for structs with named fields",
        ));
    };

    let mut stored = Vec::new();
    for field in &named.named {
        let tag = field_tag(field)?;
        if tag.as_ref().is_some_and(|tag| is_skip(&tag.value())) {
            continue;
        }
        stored.push((field, tag));
    }

    let raw_fields = stored.iter().map(|(field, tag)| {
        let name = field.ident.as_ref().map(ToString::to_string).unwrap_or_default();
        let ty = &field.ty;
        let tag = match tag {
            Some(tag) => quote!(Some(#tag)),
            None => quote!(None),
        };

        quote! {
            ::loquat::model::RawField::new(
                #name,
                #tag,
                <#ty as ::loquat::traits::FieldValue>::kind(),
            )
        }
    });

    let slot_arms = stored.iter().enumerate().map(|(index, (field, _))| {
        let field_ident = &field.ident;
        quote!(#index => Some(&self.#field_ident),)
    });
    let slot_mut_arms = stored.iter().enumerate().map(|(index, (field, _))| {
        let field_ident = &field.ident;
        quote!(#index => Some(&mut self.#field_ident),)
    });
    let values = stored.iter().map(|(field, _)| {
        let field_ident = &field.ident;
        quote!(::loquat::traits::FieldValue::to_value(&self.#field_ident))
    });

    Ok(quote! {
        impl #impl_generics ::loquat::traits::Record for #ident #ty_generics #where_clause {
            const PATH: &'static str = concat!(module_path!(), "::", stringify!(#ident));

            fn shape() -> ::loquat::model::RecordShape {
                ::loquat::model::RecordShape::new(
                    <Self as ::loquat::traits::Record>::PATH,
                    vec![#(#raw_fields),*],
                )
            }
        }

        impl #impl_generics ::loquat::traits::RecordAccess for #ident #ty_generics #where_clause {
            fn slot(&self, index: usize) -> Option<&dyn ::loquat::traits::FieldSlot> {
                match index {
                    #(#slot_arms)*
                    _ => None,
                }
            }

            fn slot_mut(&mut self, index: usize) -> Option<&mut dyn ::loquat::traits::FieldSlot> {
                match index {
                    #(#slot_mut_arms)*
                    _ => None,
                }
            }
        }

        impl #impl_generics ::loquat::traits::FieldValue for #ident #ty_generics #where_clause {
            fn kind() -> ::loquat::model::FieldKind {
                ::loquat::model::FieldKind::Record(::loquat::model::RecordRef::of::<Self>())
            }

            fn to_value(&self) -> ::loquat::value::Value {
                ::loquat::value::Value::Record(vec![#(#values),*])
            }

            fn from_value(
                value: ::loquat::value::Value,
            ) -> Result<Self, ::loquat::value::CodecError> {
                ::loquat::traits::record_from_value(value)
            }

            fn as_record(&self) -> Option<&dyn ::loquat::traits::RecordAccess> {
                Some(self)
            }

            fn as_record_mut(&mut self) -> Option<&mut dyn ::loquat::traits::RecordAccess> {
                Some(self)
            }
        }
    })
}

// field_tag
// at most one `#[loquat("...")]` per field
fn field_tag(field: &Field) -> Result<Option<LitStr>, Error> {
    let mut tag = None;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("loquat")) {
        if tag.is_some() {
            return Err(Error::new_spanned(attr, "duplicate loquat tag"));
        }
        tag = Some(attr.parse_args::<LitStr>()?);
    }

    Ok(tag)
}

fn is_skip(tag: &str) -> bool {
    tag.split(',').next().is_some_and(|head| head.trim() == "-")
}
