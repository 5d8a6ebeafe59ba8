//! FromRow derive macro implementation

use crate::attrs::{named_fields, parse_field_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_extracts = named_fields(&input, "FromRow")?
        .iter()
        .map(|field| {
            let attrs = parse_field_attrs(field, None)?;
            let field_name = &attrs.ident;
            Ok(match &attrs.column {
                Some(column_name) => quote! {
                    #field_name: row.try_get_column(#column_name)?
                },
                None => quote! {
                    #field_name: ::core::default::Default::default()
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::dbx::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::dbx::tokio_postgres::Row) -> ::dbx::OrmResult<Self> {
                use ::dbx::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_virtual_fields_use_default() {
        let input: DeriveInput = parse_quote! {
            struct Line {
                #[orm(column = "line_no")]
                no: i32,
                #[orm(virtual)]
                total: f64,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("try_get_column (\"line_no\")"));
        assert!(out.contains("Default :: default ()"));
    }

    #[test]
    fn test_rejects_enums() {
        let input: DeriveInput = parse_quote!(
            enum State {
                A,
                B,
            }
        );
        assert!(expand(input).is_err());
    }
}
