//! Derive macro for `cryo_core::Relocate`.
//!
//! `#[derive(Relocate)]` synthesizes the structural walker for a user
//! type: the compile-time `CONTAINS_POINTER` predicate plus the
//! `repair`/`seal`/`unseal`/`trace` walks, all visiting fields in
//! declaration order.
//!
//! - **Structs** walk every field.
//! - **Enums** match on the live discriminant and walk only the active
//!   variant; the discriminant itself is never rewritten. Fieldless
//!   enums come out as scalars.
//! - **Unions** are accepted only when no field transitively contains
//!   a pointer — there is no tag to dispatch on, so a pointer inside
//!   one would be unwalkable. The generated impl enforces this with a
//!   const assertion, turning a pointer-bearing union into a build
//!   failure.
//!
//! Zero-sized types (unit structs, empty field lists, empty enums) are
//! rejected: an allocation of zero bytes has no address identity to
//! relocate.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Data, DataEnum, DataStruct, DataUnion, DeriveInput, Fields, GenericParam,
    Generics, Index,
};

/// Derive `cryo_core::Relocate` for a struct, enum or union.
#[proc_macro_derive(Relocate)]
pub fn derive_relocate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = expand_relocate(&input).unwrap_or_else(|err| err.to_compile_error());
    TokenStream::from(expanded)
}

fn expand_relocate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = add_relocate_bounds(input.generics.clone());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => expand_struct(input, data)?,
        Data::Enum(data) => expand_enum(input, data)?,
        Data::Union(data) => expand_union(data),
    };

    Ok(quote! {
        // SAFETY: every pointer-bearing field is walked exactly once
        // per call, in declaration order, and nothing else is touched.
        unsafe impl #impl_generics ::cryo_core::Relocate for #name #ty_generics #where_clause {
            #body
        }
    })
}

/// Require `Relocate` of every type parameter, serde-style.
fn add_relocate_bounds(mut generics: Generics) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param
                .bounds
                .push(syn::parse_quote!(::cryo_core::Relocate));
        }
    }
    generics
}

// =============================================================================
// Structs
// =============================================================================

fn expand_struct(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream2> {
    let members = field_members(&data.fields);
    if members.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "cannot derive Relocate for a zero-sized type",
        ));
    }
    let types: Vec<_> = data.fields.iter().map(|field| &field.ty).collect();

    let contains = quote! {
        false #( || <#types as ::cryo_core::Relocate>::CONTAINS_POINTER )*
    };

    let repair = members.iter().map(|member| {
        quote! { ::cryo_core::Relocate::repair(&mut self.#member, arena, depth)?; }
    });
    let seal = members.iter().map(|member| {
        quote! { ::cryo_core::Relocate::seal(&mut self.#member, region, depth)?; }
    });
    let unseal = members.iter().map(|member| {
        quote! { ::cryo_core::Relocate::unseal(&mut self.#member, region, depth)?; }
    });
    let trace = members.iter().map(|member| {
        quote! { ::cryo_core::Relocate::trace(&self.#member, tracer, depth)?; }
    });

    Ok(quote! {
        const CONTAINS_POINTER: bool = #contains;

        unsafe fn repair(
            &mut self,
            arena: &dyn ::cryo_core::Arena,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            #(#repair)*
            Ok(())
        }

        unsafe fn seal(
            &mut self,
            region: ::cryo_core::Region,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            #(#seal)*
            Ok(())
        }

        unsafe fn unseal(
            &mut self,
            region: ::cryo_core::Region,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            #(#unseal)*
            Ok(())
        }

        unsafe fn trace(
            &self,
            tracer: &mut dyn ::cryo_core::Tracer,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            #(#trace)*
            Ok(())
        }
    })
}

/// Field accessors in declaration order: idents for named fields,
/// indices for tuple fields.
fn field_members(fields: &Fields) -> Vec<TokenStream2> {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|field| {
                let ident = field.ident.as_ref().expect("named field");
                quote!(#ident)
            })
            .collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|position| {
                let index = Index::from(position);
                quote!(#index)
            })
            .collect(),
        Fields::Unit => Vec::new(),
    }
}

// =============================================================================
// Enums
// =============================================================================

/// The four walks share one match skeleton; only the call they make on
/// each bound field differs.
enum Walk {
    Repair,
    Seal,
    Unseal,
    Trace,
}

fn expand_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "cannot derive Relocate for an empty enum",
        ));
    }

    let types: Vec<_> = data
        .variants
        .iter()
        .flat_map(|variant| variant.fields.iter().map(|field| &field.ty))
        .collect();

    // Fieldless enums are scalars: a bare discriminant with nothing to
    // walk. The default no-op walks apply.
    if types.is_empty() {
        return Ok(quote! {
            const CONTAINS_POINTER: bool = false;
        });
    }

    let contains = quote! {
        false #( || <#types as ::cryo_core::Relocate>::CONTAINS_POINTER )*
    };

    let repair_arms = enum_arms(data, &Walk::Repair);
    let seal_arms = enum_arms(data, &Walk::Seal);
    let unseal_arms = enum_arms(data, &Walk::Unseal);
    let trace_arms = enum_arms(data, &Walk::Trace);

    Ok(quote! {
        const CONTAINS_POINTER: bool = #contains;

        unsafe fn repair(
            &mut self,
            arena: &dyn ::cryo_core::Arena,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            match self { #(#repair_arms)* }
            Ok(())
        }

        unsafe fn seal(
            &mut self,
            region: ::cryo_core::Region,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            match self { #(#seal_arms)* }
            Ok(())
        }

        unsafe fn unseal(
            &mut self,
            region: ::cryo_core::Region,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            match self { #(#unseal_arms)* }
            Ok(())
        }

        unsafe fn trace(
            &self,
            tracer: &mut dyn ::cryo_core::Tracer,
            depth: usize,
        ) -> ::core::result::Result<(), ::cryo_core::Error> {
            match self { #(#trace_arms)* }
            Ok(())
        }
    })
}

fn enum_arms(data: &DataEnum, walk: &Walk) -> Vec<TokenStream2> {
    data.variants
        .iter()
        .map(|variant| {
            let ident = &variant.ident;
            let bindings = binding_idents(&variant.fields);
            let calls = bindings.iter().map(|binding| match walk {
                Walk::Repair => {
                    quote! { ::cryo_core::Relocate::repair(#binding, arena, depth)?; }
                }
                Walk::Seal => {
                    quote! { ::cryo_core::Relocate::seal(#binding, region, depth)?; }
                }
                Walk::Unseal => {
                    quote! { ::cryo_core::Relocate::unseal(#binding, region, depth)?; }
                }
                Walk::Trace => {
                    quote! { ::cryo_core::Relocate::trace(#binding, tracer, depth)?; }
                }
            });

            match &variant.fields {
                Fields::Named(named) => {
                    let patterns = named.named.iter().zip(&bindings).map(|(field, binding)| {
                        let name = field.ident.as_ref().expect("named field");
                        quote! { #name: #binding }
                    });
                    quote! { Self::#ident { #(#patterns),* } => { #(#calls)* } }
                }
                Fields::Unnamed(_) => {
                    quote! { Self::#ident ( #(#bindings),* ) => { #(#calls)* } }
                }
                Fields::Unit => quote! { Self::#ident => {} },
            }
        })
        .collect()
}

/// Binding names for a variant's fields. Synthesized (`__field0`…)
/// rather than reusing the declared names, which could shadow the
/// walker's own parameters.
fn binding_idents(fields: &Fields) -> Vec<TokenStream2> {
    let count = match fields {
        Fields::Named(named) => named.named.len(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.len(),
        Fields::Unit => 0,
    };
    (0..count)
        .map(|position| {
            let ident = format_ident!("__field{}", position);
            quote!(#ident)
        })
        .collect()
}

// =============================================================================
// Unions
// =============================================================================

fn expand_union(data: &DataUnion) -> TokenStream2 {
    let types: Vec<_> = data.fields.named.iter().map(|field| &field.ty).collect();

    // No discriminant exists to tell which field is live, so a pointer
    // anywhere inside would be unwalkable. The assertion evaluates
    // when the impl is used, failing the build for such unions. The
    // walks stay as the default no-ops: pointer-free bytes need no
    // rewriting.
    quote! {
        const CONTAINS_POINTER: bool = {
            #(
                assert!(
                    !<#types as ::cryo_core::Relocate>::CONTAINS_POINTER,
                    "unions must not contain pointers: there is no tag to walk them by",
                );
            )*
            false
        };
    }
}
