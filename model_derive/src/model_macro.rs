use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Error, Fields};

/// Re-emit the struct with the standard model derives.
///
/// Generated paths go through `::crudbase`, so callers only depend on the
/// facade crate.
///
/// Relation fields also get `#[serde(default)]` so records loaded without
/// the include still deserialize.
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as DeriveInput);

    let fields = match &mut input.data {
        Data::Struct(data) => match &mut data.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Error::new_spanned(&input.ident, "model requires named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return Error::new_spanned(&input.ident, "model can only be used on structs")
                .to_compile_error()
                .into()
        }
    };

    for field in fields.named.iter_mut() {
        if field.attrs.iter().any(|attr| attr.path().is_ident("relation")) {
            field.attrs.push(parse_quote!(#[serde(default)]));
        }
    }

    let expanded = quote! {
        #[derive(
            Debug,
            Clone,
            ::crudbase::serde::Serialize,
            ::crudbase::serde::Deserialize,
            ::crudbase::model_derive::Model
        )]
        #[serde(crate = "::crudbase::serde")]
        #input
    };

    TokenStream::from(expanded)
}
