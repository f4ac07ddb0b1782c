// surrogate-macros: code generation for typed proxies
//
// Provides:
// - #[delegatable] - on a trait, generates `<Trait>Overrides<Slot>` with
//   forwarding defaults and `impl Trait for surrogate::typed::Proxy<D, Slot>`
//
// Example:
// ```
// #[delegatable]
// pub trait Database {
//     fn connect(&mut self) -> String;
//     fn execute_query(&mut self, query: &str) -> String;
// }
//
// impl<S: Database> DatabaseOverrides<S> for Tracer {
//     fn execute_query(this: &mut Proxy<Self, S>, query: &str) -> String {
//         this.get_mut().execute_query(query)
//     }
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait};

mod delegatable;
mod rewrite;

/// Makes a trait usable as the base of a `surrogate::typed::Proxy`.
///
/// The trait is emitted unchanged, followed by:
///
/// - `trait <Trait>Overrides<Slot: Trait>: Sized`, with one associated
///   function per trait method taking `this: &Proxy<Self, Slot>` (or
///   `&mut`) in place of the receiver. Each default body forwards to the
///   slot. A `MEMBERS` constant lists the forwarded method names.
/// - `impl Trait for Proxy<Declared, Slot> where Declared: <Trait>Overrides<Slot>`,
///   routing each method through the declared type. Associated types and
///   constants are taken from the slot.
///
/// With `#[delegatable(pointers)]` the trait is also implemented for
/// `&mut T` and `Box<T>` where `T: Trait`, so a proxy can hold a borrowed
/// or boxed instance.
///
/// Only `&self` and `&mut self` methods can be forwarded. Generic traits,
/// by-value receivers, receiver-less functions, `impl Trait` arguments and
/// bare `Self` in method signatures are rejected at compile time.
#[proc_macro_attribute]
pub fn delegatable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as delegatable::DelegatableArgs);
    let input = parse_macro_input!(item as ItemTrait);
    delegatable::expand_delegatable(args, input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
