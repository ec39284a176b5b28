// Adapted from `validator_derive` (https://github.com/Keats/validator).
//
// See LICENSE for details.

use inflections::Inflect;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit};

/// Derives `crate::validation::Validate` for a struct by recursing into
/// each field, then optionally calling a `#[cesium(validate_hook = "fn")]`
/// free function for struct-level invariants that span multiple fields.
#[proc_macro_derive(Validate, attributes(cesium))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    expand(&ast).into()
}

fn validate_hook(ast: &DeriveInput) -> Option<syn::Path> {
    for attr in &ast.attrs {
        if !attr.path().is_ident("cesium") {
            continue;
        }
        let mut hook = None;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("validate_hook") {
                let value = meta.value()?;
                let lit: Lit = value.parse()?;
                if let Lit::Str(s) = lit {
                    hook = Some(format_ident!("{}", s.value()));
                }
            }
            Ok(())
        });
        if let Some(hook) = hook {
            return Some(syn::parse_quote!(#hook));
        }
    }
    None
}

fn expand(ast: &DeriveInput) -> proc_macro2::TokenStream {
    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("#[derive(Validate)] only works on structs with named fields"),
        },
        _ => panic!("#[derive(Validate)] only works on structs"),
    };

    let ident = &ast.ident;
    let field_idents: Vec<_> = fields.iter().map(|f| f.ident.as_ref().unwrap()).collect();
    let field_names: Vec<_> = field_idents
        .iter()
        .map(|ident| ident.to_string().to_camel_case())
        .collect();

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let hook_call = validate_hook(ast).map(|hook| {
        quote! {
            #hook(self, _root, _path, _report);
        }
    });

    quote! {
        impl #impl_generics crate::validation::Validate
            for #ident #ty_generics #where_clause
        {
            fn validate_minimally<P, R>(
                &self,
                _root: &crate::Root,
                _path: P,
                _report: &mut R,
            ) where
                P: Fn() -> crate::Path,
                R: FnMut(&dyn Fn() -> crate::Path, crate::validation::Error),
            {
                #(
                    self.#field_idents.validate_minimally(
                        _root,
                        || _path().field(#field_names),
                        _report,
                    );
                )*
            }

            fn validate_completely<P, R>(
                &self,
                _root: &crate::Root,
                _path: P,
                _report: &mut R,
            ) where
                P: Fn() -> crate::Path,
                R: FnMut(&dyn Fn() -> crate::Path, crate::validation::Error),
            {
                #(
                    self.#field_idents.validate_completely(
                        _root,
                        || _path().field(#field_names),
                        _report,
                    );
                )*
                #hook_call
            }
        }
    }
}
