// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `#[derive(Persist)]` for Strongbox.
//
// On a struct with named fields it generates:
// - `Entity`, whose schema is built once through `Schema::builder` with one
//   `.field(..)` per persisted field and a reconstruction constructor;
// - `Persist`, so the struct can nest inside other persisted types.
//
// On a fieldless enum it generates a by-name `Persist` impl.
//
// Container attributes: `#[persist(name = "..")]`,
// `#[persist(constructor = "path")]`, `#[persist(try_constructor = "path")]`.
// Field attributes: `#[persist(id)]`, `#[persist(rename = "..")]`,
// `#[persist(default = "..")]`, `#[persist(skip)]`.

mod attrs;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DataEnum, DeriveInput, Fields, FieldsNamed};

#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Persist cannot be derived for generic types",
        ));
    }

    let container = attrs::container(&input.attrs)?;
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => expand_struct(&input, &container, fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Persist can only be derived for structs with named fields",
            )),
        },
        Data::Enum(data) => {
            if container.constructor.is_some() || container.try_constructor.is_some() {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "enums are reconstructed by variant name and take no constructor",
                ));
            }
            expand_enum(&input, &container, data)
        }
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Persist cannot be derived for unions",
        )),
    }
}

struct FieldPlan<'a> {
    ident: &'a syn::Ident,
    name: String,
    attrs: attrs::FieldAttrs,
}

fn expand_struct(
    input: &DeriveInput,
    container: &attrs::ContainerAttrs,
    fields: &FieldsNamed,
) -> syn::Result<TokenStream2> {
    let ty = &input.ident;
    let stored = container
        .name
        .as_ref()
        .map(|lit| lit.value())
        .unwrap_or_else(|| ty.to_string());

    let mut plans = Vec::with_capacity(fields.named.len());
    let mut id_seen = false;
    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = attrs::field(&field.attrs)?;
        if attrs.id && attrs.skip {
            return Err(syn::Error::new(
                field.span(),
                "the identifier field cannot be skipped",
            ));
        }
        if attrs.id {
            if id_seen {
                return Err(syn::Error::new(
                    field.span(),
                    "only one field can be marked #[persist(id)]",
                ));
            }
            id_seen = true;
        }
        plans.push(FieldPlan {
            ident,
            name: ident.to_string(),
            attrs,
        });
    }

    let calls = plans.iter().map(|plan| {
        let ident = plan.ident;
        let name = &plan.name;
        if plan.attrs.skip {
            return quote! { .ignored(#name) };
        }
        let mut call = quote! { .field(#name, |this: &#ty| &this.#ident) };
        if plan.attrs.id {
            call.extend(quote! { .identifier() });
        }
        if let Some(rename) = &plan.attrs.rename {
            call.extend(quote! { .rename(#rename) });
        }
        if let Some(default) = &plan.attrs.default {
            call.extend(quote! { .default_value(#default) });
        }
        call
    });

    let takes: Vec<TokenStream2> = plans
        .iter()
        .filter(|plan| !plan.attrs.skip)
        .map(|plan| {
            let name = &plan.name;
            quote! { args.take(#name)? }
        })
        .collect();

    let body = if let Some(path) = &container.constructor {
        quote! { ::core::result::Result::Ok(#path(#(#takes),*)) }
    } else if let Some(path) = &container.try_constructor {
        quote! {
            #path(#(#takes),*)
                .map_err(|err| ::strongbox_core::StorageError::construction(#stored, err))
        }
    } else {
        let inits = plans.iter().map(|plan| {
            let ident = plan.ident;
            let name = &plan.name;
            if plan.attrs.skip {
                quote! { #ident: ::core::default::Default::default() }
            } else {
                quote! { #ident: args.take(#name)? }
            }
        });
        quote! { ::core::result::Result::Ok(#ty { #(#inits),* }) }
    };

    Ok(quote! {
        impl ::strongbox_core::Entity for #ty {
            fn schema() -> &'static ::strongbox_core::Schema<Self> {
                static SCHEMA: ::std::sync::OnceLock<::strongbox_core::Schema<#ty>> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    ::strongbox_core::Schema::<#ty>::builder(#stored)
                        #(#calls)*
                        .constructor(|args: &mut ::strongbox_core::Arguments<'_>| {
                            #body
                        })
                        .build()
                })
            }
        }

        impl ::strongbox_core::Persist for #ty {
            fn kind() -> ::strongbox_core::Kind {
                ::strongbox_core::Kind::Complex(<#ty as ::strongbox_core::Entity>::schema_info)
            }

            fn to_value(
                &self,
            ) -> ::core::result::Result<::strongbox_core::Value, ::strongbox_core::ConversionError> {
                ::strongbox_core::marshal::nested_value(self)
            }

            fn from_value(
                value: ::strongbox_core::Value,
                ctx: &::strongbox_core::LoadContext<'_>,
            ) -> ::core::result::Result<Self, ::strongbox_core::ConversionError> {
                ::strongbox_core::unmarshal::nested_entity(value, ctx)
            }
        }
    })
}

fn expand_enum(
    input: &DeriveInput,
    container: &attrs::ContainerAttrs,
    data: &DataEnum,
) -> syn::Result<TokenStream2> {
    let ty = &input.ident;
    let stored = container
        .name
        .as_ref()
        .map(|lit| lit.value())
        .unwrap_or_else(|| ty.to_string());

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            ty,
            "Persist cannot be derived for an enum with no variants",
        ));
    }

    let mut idents = Vec::with_capacity(data.variants.len());
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Persist can only be derived for enums whose variants have no fields",
            ));
        }
        let attrs = attrs::variant(&variant.attrs)?;
        let name = attrs
            .rename
            .map(|lit| lit.value())
            .unwrap_or_else(|| variant.ident.to_string());
        if names.contains(&name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("variant name '{name}' is used twice"),
            ));
        }
        idents.push(&variant.ident);
        names.push(name);
    }

    Ok(quote! {
        impl ::strongbox_core::Persist for #ty {
            fn kind() -> ::strongbox_core::Kind {
                ::strongbox_core::Kind::Enum {
                    name: #stored,
                    variants: &[#(#names),*],
                }
            }

            fn to_value(
                &self,
            ) -> ::core::result::Result<::strongbox_core::Value, ::strongbox_core::ConversionError> {
                let name = match self {
                    #(#ty::#idents => #names,)*
                };
                ::core::result::Result::Ok(::strongbox_core::Value::Text(name.to_string()))
            }

            fn from_value(
                value: ::strongbox_core::Value,
                _ctx: &::strongbox_core::LoadContext<'_>,
            ) -> ::core::result::Result<Self, ::strongbox_core::ConversionError> {
                match value {
                    ::strongbox_core::Value::Text(text) => match text.as_str() {
                        #(#names => ::core::result::Result::Ok(#ty::#idents),)*
                        _ => ::core::result::Result::Err(
                            ::strongbox_core::ConversionError::UnknownVariant {
                                enum_name: #stored,
                                value: text,
                            },
                        ),
                    },
                    other => ::core::result::Result::Err(
                        ::strongbox_core::ConversionError::TypeMismatch {
                            expected: "text",
                            found: other.type_name(),
                        },
                    ),
                }
            }
        }
    })
}
