use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, Type, Variant};

/// Everything the expansion needs to know about one enum variant.
struct VariantModel {
    ident: Ident,
    source: Option<(Ident, Type)>,
    has_context: bool,
    cfg_attrs: Vec<syn::Attribute>,
}

impl VariantModel {
    fn parse(variant: &Variant) -> Result<Self, syn::Error> {
        let Fields::Named(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "nosh_error requires named fields for source/context handling",
            ));
        };

        let mut source = None;
        let mut has_context = false;

        for field in &fields.named {
            let Some(ident) = field.ident.clone() else { continue };

            if ident == "context" {
                if !is_context_type(&field.ty) {
                    return Err(syn::Error::new_spanned(
                        &field.ty,
                        "context field must be Option<Cow<'static, str>>",
                    ));
                }
                has_context = true;
            } else if ident == "source"
                || field.attrs.iter().any(|a| a.path().is_ident("source") || a.path().is_ident("from"))
            {
                source = Some((ident, field.ty.clone()));
            }
        }

        if source.is_some() && !has_context {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "nosh_error requires `context: Option<Cow<'static, str>>` for variants with a source",
            ));
        }

        let cfg_attrs =
            variant.attrs.iter().filter(|attr| attr.path().is_ident("cfg")).cloned().collect();

        Ok(Self { ident: variant.ident.clone(), source, has_context, cfg_attrs })
    }
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    let Data::Enum(data) = &input.data else {
        return quote! { compile_error!("nosh_error can only be derived for enums"); };
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        match VariantModel::parse(variant) {
            Ok(model) => variants.push(model),
            Err(err) => return err.to_compile_error(),
        }
    }

    let name = &input.ident;
    let trait_name = format_ident!("{}Ext", name);

    let context_arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let (ident, cfg_attrs) = (&v.ident, &v.cfg_attrs);
        quote! { #(#cfg_attrs)* #name::#ident { context: c, .. } => *c = Some(context.into()), }
    });

    let source_impls = variants.iter().filter(|v| v.ident != "Internal").filter_map(|v| {
        let (field, ty) = v.source.as_ref()?;
        let (ident, cfg_attrs) = (&v.ident, &v.cfg_attrs);
        Some(quote! {
            #(#cfg_attrs)*
            #[automatically_derived]
            impl From<#ty> for #name {
                #[inline]
                fn from(#field: #ty) -> Self { Self::#ident { #field, context: None } }
            }

            #(#cfg_attrs)*
            impl<T> #trait_name<T> for std::result::Result<T, #ty> {
                #[inline]
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                    self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
                }
            }
        })
    });

    let internal_impls = variants.iter().find(|v| v.ident == "Internal").map(|internal| {
        let cfg_attrs = &internal.cfg_attrs;
        quote! {
            #(#cfg_attrs)*
            impl From<&'static str> for #name {
                #[inline]
                fn from(s: &'static str) -> Self { Self::Internal { message: std::borrow::Cow::Borrowed(s), context: None } }
            }
            #(#cfg_attrs)*
            impl From<String> for #name {
                #[inline]
                fn from(s: String) -> Self { Self::Internal { message: std::borrow::Cow::Owned(s), context: None } }
            }
        }
    });

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #[derive(Debug, ::thiserror::Error)]
        #input

        pub trait #trait_name<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #trait_name<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut e| {
                    match &mut e {
                        #( #context_arms )*
                        _ => {}
                    }
                    e
                })
            }
        }

        #(#source_impls)*
        #internal_impls

        #[allow(dead_code)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
            context.as_ref().map_or(std::borrow::Cow::Borrowed(""), |c| std::borrow::Cow::Owned(format!(" ({c})")))
        }
    }
}

/// Structural check for `Option<Cow<'static, str>>`, tolerant of path prefixes.
fn is_context_type(ty: &Type) -> bool {
    let rendered = ty.to_token_stream().to_string().replace(' ', "");
    rendered.ends_with("Option<Cow<'static,str>>")
        || rendered.ends_with("Option<std::borrow::Cow<'static,str>>")
        || rendered.ends_with("Option<::std::borrow::Cow<'static,str>>")
}
