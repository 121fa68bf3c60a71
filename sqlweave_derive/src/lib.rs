use proc_macro::TokenStream;

mod key_value;

/// Generates one finishing method on `KeyValueBuilder` per operator variant.
///
/// The method name defaults to the snake cased variant and can be overridden with
/// `#[key_value(method = "...")]`.
#[proc_macro_derive(KeyValueOperator, attributes(key_value))]
pub fn key_value_operator_methods(input: TokenStream) -> TokenStream {
    key_value::key_value_methods_impl(input)
}
