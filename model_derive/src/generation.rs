//! `Model` impl generation

use crate::parsing::ModelInfo;
use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

fn optional(column: &Option<String>) -> TokenStream {
    match column {
        Some(column) => quote! { ::core::option::Option::Some(#column) },
        None => quote! { ::core::option::Option::None },
    }
}

pub fn generate_model_impl(name: &Ident, info: &ModelInfo) -> TokenStream {
    let model_name = name.to_string();
    let table = &info.table;
    let primary_key = &info.primary_key;
    let columns = &info.columns;
    let unique = &info.unique_columns;
    let soft_delete = &info.soft_delete_column;
    let created_at = optional(&info.created_at_column);
    let updated_at = optional(&info.updated_at_column);

    quote! {
        impl ::crudbase::crud_store::Model for #name {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }

            fn model_name() -> &'static str {
                #model_name
            }

            fn primary_key() -> &'static str {
                #primary_key
            }

            fn unique_columns() -> &'static [&'static str] {
                &[#(#unique),*]
            }

            fn soft_delete_column() -> &'static str {
                #soft_delete
            }

            fn created_at_column() -> ::core::option::Option<&'static str> {
                #created_at
            }

            fn updated_at_column() -> ::core::option::Option<&'static str> {
                #updated_at
            }
        }
    }
}
