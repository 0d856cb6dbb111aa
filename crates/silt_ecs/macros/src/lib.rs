extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    token::Comma,
    DeriveInput, Ident, LitInt, Result,
};

struct ForeachTuple {
    macro_ident: Ident,
    start: usize,
    end: usize,
    ident: Ident,
}

impl Parse for ForeachTuple {
    fn parse(input: ParseStream) -> Result<Self> {
        let macro_ident = input.parse::<Ident>()?;
        input.parse::<Comma>()?;
        let start = input.parse::<LitInt>()?.base10_parse()?;
        input.parse::<Comma>()?;
        let end = input.parse::<LitInt>()?.base10_parse()?;
        input.parse::<Comma>()?;
        let ident = input.parse::<Ident>()?;

        Ok(ForeachTuple {
            macro_ident,
            start,
            end,
            ident,
        })
    }
}

/// Invokes a given macro once per tuple arity in the requested range, passing
/// `IdentN` type parameters.
#[proc_macro]
pub fn foreach_tuple(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as ForeachTuple);

    let idents: Vec<Ident> = (0..=input.end)
        .map(|i| format_ident!("{}{}", input.ident, i))
        .collect();

    let macro_ident = &input.macro_ident;
    let invocations = (input.start..=input.end).map(|i| {
        let idents = &idents[..i];
        quote! {
            #macro_ident!(#(#idents),*);
        }
    });

    TokenStream::from(quote! {
        #(
            #invocations
        )*
    })
}

#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let struct_name = &ast.ident;
    let (impl_generics, type_generics, where_clause) = &ast.generics.split_for_impl();

    TokenStream::from(quote! {
        impl #impl_generics Component for #struct_name #type_generics #where_clause {}
    })
}
