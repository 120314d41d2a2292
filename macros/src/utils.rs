use syn::{
    parse::{Parse, ParseStream},
    token::Token,
};

use super::*;

/// Parse a metadata key-value pair, separated by `=`.
pub fn parse_key_value<K: Token + Default + Parse, V: Parse>(
    input: ParseStream,
) -> Result<Option<V>> {
    if !input.peek(|_| K::default()) {
        return Ok(None);
    }

    let _: K = input.parse()?;
    let _: syn::Token![=] = input.parse()?;
    let value: V = input.parse::<V>()?;
    eat_comma(input);
    Ok(Some(value))
}

/// Parse a comma if there is one.
pub fn eat_comma(input: ParseStream) {
    if input.peek(syn::Token![,]) {
        let _: syn::Token![,] = input.parse().unwrap();
    }
}

/// Turn a `CamelCase` identifier into `kebab-case`.
pub fn kebab_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev_lower = false;
    for c in ident.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c == '_' {
            out.push('-');
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::kebab_case;

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("MinMax"), "min-max");
        assert_eq!(kebab_case("Histogram"), "histogram");
        assert_eq!(kebab_case("VolumeHash"), "volume-hash");
        assert_eq!(kebab_case("Histogram2D"), "histogram2-d");
        assert_eq!(kebab_case("Preview_Slice"), "preview-slice");
    }
}
