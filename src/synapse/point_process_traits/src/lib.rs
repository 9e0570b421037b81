use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};


/// Derive macro to automatically implement the accessor traits shared by all
/// point processes, including `Located` and `InstantaneousCurrent`
#[proc_macro_derive(PointProcessBase)]
pub fn derive_point_process_traits(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    // Get the name of the struct we are deriving the trait for
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Generate the implementation of the trait
    let expanded = quote! {
        impl #impl_generics Located for #name #ty_generics #where_clause {
            fn location(&self) -> SectionTarget {
                self.location
            }
        }

        impl #impl_generics InstantaneousCurrent for #name #ty_generics #where_clause {
            fn current(&self) -> f64 {
                self.current
            }
        }
    };

    TokenStream::from(expanded)
}
