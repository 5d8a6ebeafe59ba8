//! Entity derive macro implementation

use crate::attrs::{FieldAttrs, named_fields, parse_field_attrs, parse_struct_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

/// Declared type as written, e.g. `Option<chrono::NaiveDate>`.
///
/// Token spacing is kept only between two word characters (`&'a mut T`).
fn type_name(ty: &syn::Type) -> String {
    let spaced = quote!(#ty).to_string();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let chars: Vec<char> = spaced.chars().collect();
    let mut out = String::with_capacity(spaced.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = out.chars().last();
            let next = chars.get(i + 1).copied();
            if !(prev.is_some_and(is_word) && next.is_some_and(is_word)) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_attrs = parse_struct_attrs(&input)?;
    let fields = named_fields(&input, "Entity")?
        .iter()
        .map(|field| parse_field_attrs(field, struct_attrs.rename_all))
        .collect::<Result<Vec<FieldAttrs>>>()?;

    let field_defs = fields.iter().map(|f| {
        let ty = type_name(&f.ty);
        let name = match &f.name {
            Some(n) => quote!(::core::option::Option::Some(#n)),
            None => quote!(::core::option::Option::None),
        };
        let column = match &f.column {
            Some(c) => quote!(::core::option::Option::Some(#c)),
            None => quote!(::core::option::Option::None),
        };
        quote! {
            ::dbx::FieldDef { name: #name, column: #column, type_name: #ty }
        }
    });

    let table_fn = struct_attrs.table.as_ref().map(|table| {
        quote! {
            fn table() -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#table)
            }
        }
    });

    let enums_fn = struct_attrs.enums.as_ref().map(|path| {
        quote! {
            fn enums() -> ::std::vec::Vec<::dbx::EnumDefinition> {
                #path()
            }
        }
    });

    let references: Vec<_> = fields
        .iter()
        .filter_map(|f| Some((f.name.as_ref()?, f.reference.as_ref()?)))
        .map(|(name, reference)| quote!((#name.to_string(), #reference.to_string())))
        .collect();
    let references_fn = (!references.is_empty()).then(|| {
        quote! {
            fn references() -> ::std::collections::HashMap<::std::string::String, ::std::string::String> {
                ::std::collections::HashMap::from([#(#references),*])
            }
        }
    });

    let display: Vec<_> = fields
        .iter()
        .filter_map(|f| Some((f.name.as_ref()?, f.display.as_ref()?)))
        .map(|(name, display)| quote!((#name.to_string(), #display.to_string())))
        .collect();
    let display_fn = (!display.is_empty()).then(|| {
        quote! {
            fn display_columns() -> ::std::collections::HashMap<::std::string::String, ::std::string::String> {
                ::std::collections::HashMap::from([#(#display),*])
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::dbx::Entity for #name #ty_generics #where_clause {
            fn fields() -> &'static [::dbx::FieldDef] {
                static FIELDS: &[::dbx::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            #table_fn
            #enums_fn
            #references_fn
            #display_fn
        }
    })
}
