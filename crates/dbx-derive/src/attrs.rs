//! `#[orm(...)]` attribute parsing shared by the derives.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use syn::{DeriveInput, Fields, Result};

/// Case convention for external names not given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    CamelCase,
    PascalCase,
    SnakeCase,
    KebabCase,
}

impl RenameRule {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "camelCase" => Some(Self::CamelCase),
            "PascalCase" => Some(Self::PascalCase),
            "snake_case" => Some(Self::SnakeCase),
            "kebab-case" => Some(Self::KebabCase),
            _ => None,
        }
    }

    pub fn apply(self, field: &str) -> String {
        match self {
            Self::CamelCase => field.to_lower_camel_case(),
            Self::PascalCase => field.to_upper_camel_case(),
            Self::SnakeCase => field.to_snake_case(),
            Self::KebabCase => field.to_kebab_case(),
        }
    }
}

/// Struct-level `#[orm(...)]` options.
#[derive(Debug, Default)]
pub struct StructAttrs {
    pub table: Option<String>,
    /// Function returning `Vec<dbx::EnumDefinition>`.
    pub enums: Option<syn::Path>,
    pub rename_all: Option<RenameRule>,
}

/// Field-level `#[orm(...)]` options, with defaults applied.
#[derive(Debug)]
pub struct FieldAttrs {
    pub ident: syn::Ident,
    pub ty: syn::Type,
    /// External name; `None` when `#[orm(skip)]`.
    pub name: Option<String>,
    /// Storage column; `None` when `#[orm(virtual)]`.
    pub column: Option<String>,
    pub reference: Option<String>,
    pub display: Option<String>,
}

fn lit_str(nv: &syn::MetaNameValue, key: &str) -> Result<String> {
    let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(lit),
        ..
    }) = &nv.value
    else {
        return Err(syn::Error::new_spanned(
            nv,
            format!("orm({key} = \"...\") expects a string literal"),
        ));
    };
    Ok(lit.value())
}

fn orm_items(attrs: &[syn::Attribute]) -> Result<Vec<syn::Meta>> {
    let mut items = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let metas = attr.parse_args_with(
            syn::punctuated::Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated,
        )?;
        items.extend(metas);
    }
    Ok(items)
}

pub fn parse_struct_attrs(input: &DeriveInput) -> Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for meta in orm_items(&input.attrs)? {
        let syn::Meta::NameValue(nv) = &meta else {
            return Err(syn::Error::new_spanned(meta, "unknown orm attribute"));
        };
        if nv.path.is_ident("table") {
            out.table = Some(lit_str(nv, "table")?);
        } else if nv.path.is_ident("enums") {
            let path = lit_str(nv, "enums")?;
            let path: syn::Path = syn::parse_str(&path).map_err(|e| {
                syn::Error::new_spanned(nv, format!("invalid orm(enums) function path: {e}"))
            })?;
            out.enums = Some(path);
        } else if nv.path.is_ident("rename_all") {
            let rule = lit_str(nv, "rename_all")?;
            out.rename_all = Some(RenameRule::parse(&rule).ok_or_else(|| {
                syn::Error::new_spanned(
                    nv,
                    "orm(rename_all) expects camelCase, PascalCase, snake_case or kebab-case",
                )
            })?);
        } else {
            return Err(syn::Error::new_spanned(nv, "unknown orm attribute"));
        }
    }
    Ok(out)
}

pub fn parse_field_attrs(
    field: &syn::Field,
    rename_all: Option<RenameRule>,
) -> Result<FieldAttrs> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

    let mut name = None;
    let mut column = None;
    let mut reference = None;
    let mut display = None;
    let mut skip = false;
    let mut is_virtual = false;

    for meta in orm_items(&field.attrs)? {
        match &meta {
            syn::Meta::Path(path) if path.is_ident("skip") => skip = true,
            syn::Meta::Path(path) if path.is_ident("virtual") => is_virtual = true,
            syn::Meta::NameValue(nv) if nv.path.is_ident("name") => {
                name = Some(lit_str(nv, "name")?)
            }
            syn::Meta::NameValue(nv) if nv.path.is_ident("column") => {
                column = Some(lit_str(nv, "column")?)
            }
            syn::Meta::NameValue(nv) if nv.path.is_ident("reference") => {
                reference = Some(lit_str(nv, "reference")?)
            }
            syn::Meta::NameValue(nv) if nv.path.is_ident("display") => {
                display = Some(lit_str(nv, "display")?)
            }
            _ => return Err(syn::Error::new_spanned(meta, "unknown orm attribute")),
        }
    }

    if is_virtual && column.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            "orm(virtual) fields cannot have a column",
        ));
    }
    if skip && (name.is_some() || reference.is_some() || display.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "orm(skip) fields cannot have a name, reference or display",
        ));
    }

    let field_name = ident.to_string();
    Ok(FieldAttrs {
        name: if skip {
            None
        } else {
            Some(name.unwrap_or_else(|| match rename_all {
                Some(rule) => rule.apply(&field_name),
                None => field_name.clone(),
            }))
        },
        column: if is_virtual {
            None
        } else {
            Some(column.unwrap_or(field_name))
        },
        ident,
        ty: field.ty.clone(),
        reference,
        display,
    })
}

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_field_defaults() {
        let field: syn::Field = parse_quote!(user_id: i64);
        let attrs = parse_field_attrs(&field, None).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("user_id"));
        assert_eq!(attrs.column.as_deref(), Some("user_id"));
        assert!(attrs.reference.is_none());
    }

    #[test]
    fn test_field_options() {
        let field: syn::Field = parse_quote! {
            #[orm(name = "userId", column = "user_id", reference = "users", display = "User")]
            user: i64
        };
        let attrs = parse_field_attrs(&field, None).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("userId"));
        assert_eq!(attrs.column.as_deref(), Some("user_id"));
        assert_eq!(attrs.reference.as_deref(), Some("users"));
        assert_eq!(attrs.display.as_deref(), Some("User"));
    }

    #[test]
    fn test_virtual_and_skip() {
        let field: syn::Field = parse_quote! {
            #[orm(virtual, display = "Full name")]
            full_name: String
        };
        let attrs = parse_field_attrs(&field, None).unwrap();
        assert!(attrs.column.is_none());
        assert_eq!(attrs.name.as_deref(), Some("full_name"));

        let field: syn::Field = parse_quote! {
            #[orm(skip)]
            password_hash: String
        };
        let attrs = parse_field_attrs(&field, None).unwrap();
        assert!(attrs.name.is_none());
        assert_eq!(attrs.column.as_deref(), Some("password_hash"));
    }

    #[test]
    fn test_conflicting_options_are_rejected() {
        let field: syn::Field = parse_quote! {
            #[orm(virtual, column = "x")]
            x: i32
        };
        assert!(parse_field_attrs(&field, None).is_err());

        let field: syn::Field = parse_quote! {
            #[orm(skip, display = "X")]
            x: i32
        };
        assert!(parse_field_attrs(&field, None).is_err());

        let field: syn::Field = parse_quote! {
            #[orm(colum = "x")]
            x: i32
        };
        assert!(parse_field_attrs(&field, None).is_err());
    }

    #[test]
    fn test_rename_all_only_touches_implicit_names() {
        let field: syn::Field = parse_quote!(created_at: String);
        let attrs = parse_field_attrs(&field, Some(RenameRule::CamelCase)).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("createdAt"));
        assert_eq!(attrs.column.as_deref(), Some("created_at"));

        let field: syn::Field = parse_quote! {
            #[orm(name = "created")]
            created_at: String
        };
        let attrs = parse_field_attrs(&field, Some(RenameRule::CamelCase)).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("created"));
    }

    #[test]
    fn test_struct_attrs() {
        let input: DeriveInput = parse_quote! {
            #[orm(table = "accounts", enums = "crate::dicts::account_enums")]
            struct Account { id: i64 }
        };
        let attrs = parse_struct_attrs(&input).unwrap();
        assert_eq!(attrs.table.as_deref(), Some("accounts"));
        assert!(attrs.enums.is_some());
        assert!(attrs.rename_all.is_none());

        let input: DeriveInput = parse_quote! {
            #[orm(rename_all = "kebab-case")]
            struct Account { id: i64 }
        };
        let attrs = parse_struct_attrs(&input).unwrap();
        assert_eq!(attrs.rename_all, Some(RenameRule::KebabCase));

        let input: DeriveInput = parse_quote! {
            #[orm(rename_all = "lowercase")]
            struct Account { id: i64 }
        };
        assert!(parse_struct_attrs(&input).is_err());

        let input: DeriveInput = parse_quote! {
            #[orm(enums = "not a path")]
            struct Account { id: i64 }
        };
        assert!(parse_struct_attrs(&input).is_err());
    }
}
