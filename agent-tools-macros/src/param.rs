use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, Lit, LitStr, Meta, Path, Token, Variant,
    parse_quote,
};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = crate_path(input)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data)
            if data.variants.iter().all(|variant| matches!(variant.fields, Fields::Unit)) =>
        {
            let rule = rename_all(input)?;
            let constants = data
                .variants
                .iter()
                .map(|variant| constant_name(variant, rule.as_deref()))
                .collect::<syn::Result<Vec<_>>>()?;
            let len = constants.len();
            quote! {
                let constants: [&str; #len] = [#(#constants),*];
                #krate::SemanticType::enumeration(::std::any::type_name::<Self>(), constants)
            }
        }
        _ => quote!(#krate::SemanticType::object(::std::any::type_name::<Self>())),
    };

    Ok(quote! {
        impl #impl_generics #krate::ToolParam for #ident #ty_generics #where_clause {
            fn semantic_type() -> #krate::SemanticType {
                #body
            }
        }
    })
}

fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut krate: Path = parse_quote!(::agent_tools);
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("tool_param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let path: LitStr = meta.value()?.parse()?;
                krate = path.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported `tool_param` option"))
            }
        })?;
    }
    Ok(krate)
}

/// Serialized name of a unit variant, following serde's `rename` and the
/// container's `rename_all`.
fn constant_name(variant: &Variant, rule: Option<&str>) -> syn::Result<String> {
    if let Some(name) = serde_value(&variant.attrs, "rename")? {
        return Ok(name);
    }
    let ident = variant.ident.to_string();
    Ok(match rule {
        Some(rule) => apply_rename_rule(&ident, rule),
        None => ident,
    })
}

fn rename_all(input: &DeriveInput) -> syn::Result<Option<String>> {
    serde_value(&input.attrs, "rename_all")
}

fn serde_value(attrs: &[Attribute], key: &str) -> syn::Result<Option<String>> {
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            let Meta::NameValue(pair) = meta else {
                continue;
            };
            if !pair.path.is_ident(key) {
                continue;
            }
            if let Expr::Lit(expr) = &pair.value {
                if let Lit::Str(name) = &expr.lit {
                    return Ok(Some(name.value()));
                }
            }
        }
    }
    Ok(None)
}

/// Applies a serde `rename_all` rule to a `PascalCase` variant name.
fn apply_rename_rule(ident: &str, rule: &str) -> String {
    let words = split_words(ident);
    let join = |separator: &str, upper: bool| {
        let words: Vec<String> = words
            .iter()
            .map(|word| if upper { word.to_uppercase() } else { word.to_lowercase() })
            .collect();
        words.join(separator)
    };
    match rule {
        "lowercase" => ident.to_lowercase(),
        "UPPERCASE" => ident.to_uppercase(),
        "camelCase" => {
            let mut chars = ident.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_lowercase().chain(chars).collect()
            })
        }
        "snake_case" => join("_", false),
        "SCREAMING_SNAKE_CASE" => join("_", true),
        "kebab-case" => join("-", false),
        "SCREAMING-KEBAB-CASE" => join("-", true),
        _ => ident.to_owned(),
    }
}

fn split_words(ident: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for ch in ident.chars() {
        match words.last_mut() {
            Some(word) if !ch.is_uppercase() => word.push(ch),
            _ => words.push(ch.to_string()),
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_rename_rules() {
        assert_eq!(apply_rename_rule("FeelsLike", "lowercase"), "feelslike");
        assert_eq!(apply_rename_rule("FeelsLike", "snake_case"), "feels_like");
        assert_eq!(apply_rename_rule("FeelsLike", "SCREAMING_SNAKE_CASE"), "FEELS_LIKE");
        assert_eq!(apply_rename_rule("FeelsLike", "kebab-case"), "feels-like");
        assert_eq!(apply_rename_rule("FeelsLike", "camelCase"), "feelsLike");
    }

    #[test]
    fn variant_rename_wins_over_container_rule() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "lowercase")]
            enum Unit {
                Celsius,
                #[serde(rename = "F")]
                Fahrenheit,
            }
        };
        let Data::Enum(data) = &input.data else {
            unreachable!("parsed an enum");
        };
        let rule = rename_all(&input).unwrap();
        let names: Vec<_> = data
            .variants
            .iter()
            .map(|variant| constant_name(variant, rule.as_deref()).unwrap())
            .collect();
        assert_eq!(names, vec!["celsius", "F"]);
    }
}
