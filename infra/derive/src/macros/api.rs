use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, Token};

/// Adds `Debug`, `Serialize`, `Deserialize` and `ToSchema` (unless derived already), a
/// `rename_all` (camelCase by default) and `deny_unknown_fields` (unless disabled).
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let (rename_all, deny_unknown) = match parse_model_args(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };
    if has_serde_arg(&input.attrs, "rename_all") {
        return syn::Error::new_spanned(
            &input.ident,
            "set the case through api_model(rename_all = \"...\"), not serde",
        )
        .to_compile_error();
    }

    let derived = derived_traits(&input.attrs);
    let mut derives = Vec::new();
    for (name, path) in [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
        ("ToSchema", quote! { ::utoipa::ToSchema }),
    ] {
        if !derived.iter().any(|d| d == name) {
            derives.push(path);
        }
    }
    let derive_attr = if derives.is_empty() { quote! {} } else { quote! { #[derive(#(#derives),*)] } };
    let deny_attr = if deny_unknown && !has_serde_arg(&input.attrs, "deny_unknown_fields") {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote! {}
    };

    quote! {
        #derive_attr
        #[serde(rename_all = #rename_all)]
        #deny_attr
        #input
    }
}

/// Forwards `args` to `utoipa::path` and leaves the handler untouched.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    quote! {
        #[allow(clippy::unused_async)]
        #[::utoipa::path(#args)]
        #input
    }
}

fn parse_model_args(args: TokenStream) -> syn::Result<(LitStr, bool)> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut rename_all = LitStr::new("camelCase", proc_macro2::Span::call_site());
    let mut deny_unknown = true;

    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `name = value` arguments"));
        };
        let Expr::Lit(lit) = &nv.value else {
            return Err(syn::Error::new_spanned(&nv.value, "expected a literal"));
        };
        match (&lit.lit, nv.path.get_ident().map(ToString::to_string).as_deref()) {
            (Lit::Str(s), Some("rename_all")) => rename_all = s.clone(),
            (Lit::Bool(b), Some("deny_unknown_fields")) => deny_unknown = b.value,
            _ => {
                return Err(syn::Error::new_spanned(
                    &nv,
                    "supported arguments: rename_all = \"...\", deny_unknown_fields = bool",
                ));
            },
        }
    }
    Ok((rename_all, deny_unknown))
}

fn has_serde_arg(attrs: &[Attribute], name: &str) -> bool {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(name) {
                found = true;
            }
            if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
    }
    found
}

fn derived_traits(attrs: &[Attribute]) -> Vec<String> {
    let mut traits = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(segment) = meta.path.segments.last() {
                traits.push(segment.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}
