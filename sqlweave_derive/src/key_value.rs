use darling::{FromDeriveInput, FromVariant, ast};
use heck::ToSnakeCase;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(enum_unit))]
struct KeyValueDeriveInput {
    ident: syn::Ident,
    data: ast::Data<KeyValueVariant, ()>,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(key_value))]
struct KeyValueVariant {
    ident: syn::Ident,
    #[darling(default)]
    method: Option<String>,
    #[darling(default)]
    ignore: bool,
}

pub fn key_value_methods_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let enum_info = match KeyValueDeriveInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return e.write_errors().into(),
    };

    let enum_name = &enum_info.ident;

    let variants = match enum_info.data.take_enum() {
        Some(variants) => variants,
        None => {
            return syn::Error::new_spanned(&input.ident, "only unit enums are supported")
                .to_compile_error()
                .into();
        }
    };

    let methods = variants.iter().filter_map(|var| {
        if var.ignore {
            return None;
        }

        let var_name = &var.ident;
        let name = var
            .method
            .clone()
            .unwrap_or_else(|| var_name.to_string().to_snake_case());
        let method_fn = format_ident!("{}", name);
        let doc = format!(
            "Finishes the leaf as `column {}` and appends it to the parent predicate.",
            var_name
        );

        Some(quote! {
            #[doc = #doc]
            pub fn #method_fn<V>(self, value: V) -> &'a mut P
            where
                V: crate::IntoValue,
            {
                self.finish(#enum_name::#var_name, value.into_value())
            }
        })
    });

    quote! {
        impl<'a, P> crate::predicate::KeyValueBuilder<'a, P>
        where
            P: crate::predicate::Predicate + ?Sized,
        {
            #(#methods)*
        }
    }
    .into()
}
