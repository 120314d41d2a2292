extern crate proc_macro;

macro_rules! bail {
    ($item:expr, $fmt:literal $($tts:tt)*) => {
        return Err(Error::new_spanned(
            &$item,
            format!(concat!("volcache: ", $fmt) $($tts)*)
        ))
    }
}

mod derive;
mod utils;

use proc_macro::TokenStream;
use syn::{Error, Result};

/// Implement `DerivedData` for a type.
///
/// The result type key defaults to the kebab-cased type name. It can be
/// overridden with `#[derived(key = "...")]`.
///
/// ```ignore
/// /// Mean intensity of a volume.
/// #[derive(DerivedData)]
/// #[derived(key = "mean")]
/// pub struct MeanIntensity(f32);
/// ```
#[proc_macro_derive(DerivedData, attributes(derived))]
pub fn derived_data(stream: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(stream as syn::DeriveInput);
    derive::expand(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
