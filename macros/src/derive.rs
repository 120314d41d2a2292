use quote::quote;
use syn::parse::ParseStream;

use super::*;

mod kw {
    syn::custom_keyword!(key);
}

/// Implement `DerivedData` for a struct or enum.
pub fn expand(item: syn::DeriveInput) -> Result<proc_macro2::TokenStream> {
    if !item.generics.params.is_empty() {
        bail!(item.generics, "generic types are not supported");
    }

    if let syn::Data::Union(_) = &item.data {
        bail!(item.ident, "unions are not supported");
    }

    let mut key = None;
    for attr in &item.attrs {
        if !attr.path().is_ident("derived") {
            continue;
        }
        if key.is_some() {
            bail!(attr, "duplicate `derived` attribute");
        }
        key = Some(attr.parse_args_with(|input: ParseStream| {
            let value = utils::parse_key_value::<kw::key, syn::LitStr>(input)?;
            if !input.is_empty() {
                return Err(input.error("volcache: expected `key = \"...\"`"));
            }
            Ok(value)
        })?);
    }

    let key = match key.flatten() {
        Some(lit) if lit.value().is_empty() => {
            bail!(lit, "result type key must not be empty")
        }
        Some(lit) => lit.value(),
        None => utils::kebab_case(&item.ident.to_string()),
    };

    let ident = &item.ident;
    Ok(quote! {
        impl ::volcache::DerivedData for #ident {
            const KEY: ::volcache::DataKey = ::volcache::DataKey::new(#key);
        }
    })
}
