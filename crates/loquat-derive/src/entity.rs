use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, LitStr};

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

///
/// EntityArgs
///

#[derive(Default)]
struct EntityArgs {
    name: Option<LitStr>,
    hooks: bool,
}

fn expand(input: &DeriveInput) -> Result<TokenStream, Error> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let args = parse_args(input)?;

    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let hooks = args.hooks.then(|| {
        quote! {
            fn hooks() -> ::loquat::traits::HookBindings {
                ::loquat::traits::HookBindings::of::<Self>()
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::loquat::traits::Entity for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;

            #hooks
        }
    })
}

fn parse_args(input: &DeriveInput) -> Result<EntityArgs, Error> {
    let mut args = EntityArgs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("loquat")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("hooks") {
                args.hooks = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `hooks`"))
            }
        })?;
    }

    Ok(args)
}
