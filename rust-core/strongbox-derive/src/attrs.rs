// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `#[persist(...)]` attribute parsing.

use syn::{Attribute, LitStr, Path};

/// Attributes on the struct or enum itself.
#[derive(Default)]
pub struct ContainerAttrs {
    /// `name = "..."`: stored type name (folder, table, collection).
    pub name: Option<LitStr>,
    /// `constructor = "path"`: infallible reconstruction function.
    pub constructor: Option<Path>,
    /// `try_constructor = "path"`: fallible reconstruction function.
    pub try_constructor: Option<Path>,
}

/// Attributes on one struct field.
#[derive(Default)]
pub struct FieldAttrs {
    pub id: bool,
    pub skip: bool,
    pub rename: Option<LitStr>,
    pub default: Option<LitStr>,
}

/// Attributes on one enum variant.
#[derive(Default)]
pub struct VariantAttrs {
    pub rename: Option<LitStr>,
}

fn persist_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("persist"))
}

pub fn container(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in persist_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("constructor") {
                let lit: LitStr = meta.value()?.parse()?;
                out.constructor = Some(lit.parse()?);
                Ok(())
            } else if meta.path.is_ident("try_constructor") {
                let lit: LitStr = meta.value()?.parse()?;
                out.try_constructor = Some(lit.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown persist attribute; expected `name`, `constructor` or `try_constructor`"))
            }
        })?;
    }
    if let (Some(_), Some(path)) = (&out.constructor, &out.try_constructor) {
        return Err(syn::Error::new_spanned(
            path,
            "`constructor` and `try_constructor` are mutually exclusive",
        ));
    }
    Ok(out)
}

pub fn field(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in persist_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                out.id = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                out.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                out.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("default") {
                out.default = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown persist attribute; expected `id`, `skip`, `rename` or `default`"))
            }
        })?;
    }
    Ok(out)
}

pub fn variant(attrs: &[Attribute]) -> syn::Result<VariantAttrs> {
    let mut out = VariantAttrs::default();
    for attr in persist_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                out.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown persist attribute; expected `rename`"))
            }
        })?;
    }
    Ok(out)
}
