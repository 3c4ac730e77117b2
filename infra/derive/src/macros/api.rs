use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, ItemStruct, LitBool, LitStr, Meta};

/// Expands the `#[api_model]` attribute macro.
///
/// Automatically adds common derives (`Serialize`, `Deserialize`, `ToSchema`) and
/// configures Serde for camelCase and strict field checking.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let args = match ApiModelArgs::parse(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };
    let derives = derived_trait_names(&input.attrs);
    let serde_meta = match SerdeMetaInfo::collect(&input.attrs) {
        Ok(info) => info,
        Err(err) => return err.to_compile_error(),
    };

    let mut derive_tokens = Vec::new();
    if !derives.contains("Debug") {
        derive_tokens.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        derive_tokens.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        derive_tokens.push(quote! { ::serde::Deserialize });
    }
    let derive_attr = if derive_tokens.is_empty() {
        quote! {}
    } else {
        quote! { #[derive(#(#derive_tokens),*)] }
    };

    let to_schema_attr = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let rename_value = args
        .rename_all
        .unwrap_or_else(|| LitStr::new("camelCase", proc_macro2::Span::call_site()));
    let rename_attr = match &serde_meta.rename_all {
        Some(existing) if existing.value() != rename_value.value() => {
            return syn::Error::new_spanned(
                existing,
                "Conflicting serde rename_all; remove it or set api_model(rename_all = \"...\") to match",
            )
            .to_compile_error();
        },
        Some(_) => quote! {},
        None => quote! { #[serde(rename_all = #rename_value)] },
    };

    let deny_unknown = args.deny_unknown_fields.unwrap_or(true);
    let deny_attr = if serde_meta.deny_unknown_fields {
        if !deny_unknown {
            return syn::Error::new_spanned(
                &input.ident,
                "deny_unknown_fields is already set via serde; remove it before disabling",
            )
            .to_compile_error();
        }
        quote! {}
    } else if deny_unknown {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote! {}
    };

    quote! {
        #derive_attr
        #to_schema_attr
        #rename_attr
        #deny_attr
        #input
    }
}

/// Expands the `#[api_handler]` attribute macro.
///
/// Integrates with `utoipa::path` for `OpenAPI` documentation while maintaining
/// clean handler signatures.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let body = &input.block;
    let sig = &input.sig;
    let vis = &input.vis;
    let attrs = &input.attrs;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig {
            #body
        }
    }
}

#[derive(Default)]
struct ApiModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

impl ApiModelArgs {
    fn parse(args: TokenStream) -> Result<Self, syn::Error> {
        let mut parsed = Self::default();
        if args.is_empty() {
            return Ok(parsed);
        }

        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("rename_all") {
                if parsed.rename_all.is_some() {
                    return Err(meta.error("Duplicate argument"));
                }
                parsed.rename_all = Some(meta.value()?.parse::<LitStr>()?);
                return Ok(());
            }
            if meta.path.is_ident("deny_unknown_fields") {
                if parsed.deny_unknown_fields.is_some() {
                    return Err(meta.error("Duplicate argument"));
                }
                parsed.deny_unknown_fields = Some(meta.value()?.parse::<LitBool>()?.value);
                return Ok(());
            }
            Err(meta.error("Unsupported argument; expected rename_all or deny_unknown_fields"))
        });

        parser.parse2(args)?;
        Ok(parsed)
    }
}

struct SerdeMetaInfo {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

impl SerdeMetaInfo {
    fn collect(attrs: &[Attribute]) -> Result<Self, syn::Error> {
        let mut rename_all = None;
        let mut deny_unknown_fields = false;

        for attr in attrs {
            if !attr.path().is_ident("serde") {
                continue;
            }
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    rename_all = Some(meta.value()?.parse::<LitStr>()?);
                    return Ok(());
                }
                if meta.path.is_ident("deny_unknown_fields") {
                    deny_unknown_fields = true;
                    return Ok(());
                }
                Ok(())
            })?;
        }

        Ok(Self { rename_all, deny_unknown_fields })
    }
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.segments.last().map(|seg| seg.ident.to_string()) {
                traits.insert(ident);
            }
            Ok(())
        });
    }

    traits
}
