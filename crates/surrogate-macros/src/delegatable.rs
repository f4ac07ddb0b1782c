// #[delegatable] proc-macro implementation
//
// Generates the overrides trait and the proxy impl for a trait.

use proc_macro2::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::visit_mut::VisitMut;
use syn::{
    parse_quote, FnArg, GenericParam, Ident, ItemTrait, Lifetime, LifetimeParam, Pat, PatIdent,
    PatType, Result, Signature, Token, TraitItem, TraitItemConst, TraitItemFn, TraitItemType,
    Type, WherePredicate,
};

use crate::rewrite::{ElidedLifetimes, ImplTraitFinder, SelfPaths};

/// Options accepted inside `#[delegatable(...)]`
#[derive(Debug, Default)]
pub struct DelegatableArgs {
    /// Also implement the trait for `&mut T` and `Box<T>`
    pub pointers: bool,
}

impl Parse for DelegatableArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = DelegatableArgs::default();
        let options = Punctuated::<Ident, Token![,]>::parse_terminated(input)?;
        for option in options {
            if option == "pointers" {
                args.pointers = true;
            } else {
                return Err(syn::Error::new(
                    option.span(),
                    format!("unknown option `{}`; expected `pointers`", option),
                ));
            }
        }
        Ok(args)
    }
}

/// How a forwarded method borrows its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverKind {
    Shared,
    Mutable,
}

/// Everything needed to emit one forwarded method
struct Forwarded {
    /// Trait signature with arguments renamed to plain identifiers
    sig: Signature,
    receiver: ReceiverKind,
    receiver_lifetime: Option<Lifetime>,
    args: Vec<Ident>,
    turbofish: TokenStream,
    docs: Vec<syn::Attribute>,
}

impl Forwarded {
    fn name(&self) -> &Ident {
        &self.sig.ident
    }

    /// Append `.await` for async methods; wrap unsafe calls.
    fn finish_call(&self, call: TokenStream) -> TokenStream {
        let call = if self.sig.asyncness.is_some() {
            quote! { #call.await }
        } else {
            call
        };
        if self.sig.unsafety.is_some() {
            quote! { unsafe { #call } }
        } else {
            call
        }
    }
}

fn ident_pat(ident: Ident) -> Pat {
    Pat::Ident(PatIdent {
        attrs: Vec::new(),
        by_ref: None,
        mutability: None,
        ident,
        subpat: None,
    })
}

/// Validates a trait method and collects what forwarding needs.
fn analyze_method(method: &TraitItemFn) -> Result<Forwarded> {
    let mut sig = method.sig.clone();

    let (receiver, receiver_lifetime) = match sig.inputs.first() {
        Some(FnArg::Receiver(recv)) => {
            let reference = match (&recv.reference, &recv.colon_token) {
                (Some(reference), None) => reference,
                (None, None) => {
                    return Err(syn::Error::new_spanned(
                        recv,
                        "by-value `self` receivers cannot be forwarded through a proxy",
                    ))
                }
                (_, Some(_)) => {
                    return Err(syn::Error::new_spanned(
                        recv,
                        "only `&self` and `&mut self` receivers are supported",
                    ))
                }
            };
            let kind = if recv.mutability.is_some() {
                ReceiverKind::Mutable
            } else {
                ReceiverKind::Shared
            };
            (kind, reference.1.clone())
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "associated functions without a `self` receiver cannot be forwarded",
            ))
        }
    };

    let mut args = Vec::new();
    for (i, input) in sig.inputs.iter_mut().enumerate().skip(1) {
        if let FnArg::Typed(pat_type) = input {
            let mut finder = ImplTraitFinder::default();
            finder.visit_type_mut(&mut pat_type.ty);
            if let Some(err) = finder.found {
                return Err(err);
            }

            let name = match &*pat_type.pat {
                Pat::Ident(pat) if pat.ident != "this" => pat.ident.clone(),
                _ => format_ident!("arg{}", i),
            };
            pat_type.pat = Box::new(ident_pat(name.clone()));
            args.push(name);
        }
    }

    let type_params: Vec<TokenStream> = sig
        .generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.to_token_stream()),
            GenericParam::Const(c) => Some(c.ident.to_token_stream()),
            GenericParam::Lifetime(_) => None,
        })
        .collect();
    let turbofish = if type_params.is_empty() {
        TokenStream::new()
    } else {
        quote! { ::<#(#type_params),*> }
    };

    let docs = method
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .cloned()
        .collect();

    Ok(Forwarded {
        sig,
        receiver,
        receiver_lifetime,
        args,
        turbofish,
        docs,
    })
}

fn bounds_self(predicate: &WherePredicate) -> bool {
    match predicate {
        WherePredicate::Type(pt) => match &pt.bounded_ty {
            Type::Path(tp) => tp.qself.is_none() && tp.path.is_ident("Self"),
            _ => false,
        },
        _ => false,
    }
}

/// Signature of the method inside `<Trait>Overrides`.
///
/// The receiver becomes `this: &Proxy<Self, Slot>`, `Self::X` paths point
/// at the slot, and elided output lifetimes follow `this`.
fn override_signature(fwd: &Forwarded, trait_ident: &Ident, slot: &Ident) -> Result<Signature> {
    let mut sig = fwd.sig.clone();

    if let Some(where_clause) = &mut sig.generics.where_clause {
        where_clause.predicates = where_clause
            .predicates
            .iter()
            .filter(|p| !bounds_self(p))
            .cloned()
            .collect();
    }

    let mut rewriter = SelfPaths::new(trait_ident, slot);
    rewriter.visit_generics_mut(&mut sig.generics);
    for input in sig.inputs.iter_mut().skip(1) {
        if let FnArg::Typed(pat_type) = input {
            rewriter.visit_type_mut(&mut pat_type.ty);
        }
    }
    rewriter.visit_return_type_mut(&mut sig.output);
    rewriter.finish()?;

    let lifetime = match &fwd.receiver_lifetime {
        Some(lifetime) => lifetime.clone(),
        None => {
            let lifetime: Lifetime = parse_quote!('this);
            sig.generics
                .params
                .insert(0, GenericParam::Lifetime(LifetimeParam::new(lifetime.clone())));
            sig.generics.lt_token.get_or_insert_with(Default::default);
            sig.generics.gt_token.get_or_insert_with(Default::default);
            lifetime
        }
    };
    ElidedLifetimes {
        lifetime: lifetime.clone(),
    }
    .visit_return_type_mut(&mut sig.output);

    let proxy_ty: Type = match fwd.receiver {
        ReceiverKind::Shared => parse_quote!(&#lifetime ::surrogate::typed::Proxy<Self, #slot>),
        ReceiverKind::Mutable => {
            parse_quote!(&#lifetime mut ::surrogate::typed::Proxy<Self, #slot>)
        }
    };
    sig.inputs[0] = FnArg::Typed(PatType {
        attrs: Vec::new(),
        pat: Box::new(ident_pat(format_ident!("this"))),
        colon_token: Default::default(),
        ty: Box::new(proxy_ty),
    });

    Ok(sig)
}

fn check_assoc_type(item: &TraitItemType) -> Result<()> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic associated types cannot be forwarded",
        ));
    }
    Ok(())
}

/// Expands the #[delegatable] attribute macro.
///
/// Input: a trait definition
/// Output: the trait, `<Trait>Overrides<Slot>`, the `Proxy` impl and,
/// with `pointers`, impls for `&mut T` and `Box<T>`
pub fn expand_delegatable(args: DelegatableArgs, item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic traits cannot be made delegatable",
        ));
    }

    let trait_ident = &item.ident;
    let vis = &item.vis;
    let unsafety = &item.unsafety;
    let overrides_ident = format_ident!("{}Overrides", trait_ident);
    let slot = format_ident!("Slot");
    let declared = format_ident!("Declared");

    let mut methods = Vec::new();
    let mut assoc_types: Vec<&Ident> = Vec::new();
    let mut assoc_consts: Vec<(&Ident, &Type)> = Vec::new();

    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(analyze_method(method)?),
            TraitItem::Type(ty) => {
                check_assoc_type(ty)?;
                assoc_types.push(&ty.ident);
            }
            TraitItem::Const(TraitItemConst { ident, ty, .. }) => {
                assoc_consts.push((ident, ty));
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported item in a delegatable trait",
                ))
            }
        }
    }

    // <Trait>Overrides: one forwarding default per method.
    let member_names: Vec<String> = methods.iter().map(|m| m.name().to_string()).collect();
    let mut override_fns = Vec::new();
    for fwd in &methods {
        let sig = override_signature(fwd, trait_ident, &slot)?;
        let name = fwd.name();
        let turbofish = &fwd.turbofish;
        let args = &fwd.args;
        let docs = &fwd.docs;
        let access = match fwd.receiver {
            ReceiverKind::Shared => quote! { ::surrogate::typed::Proxy::get(this) },
            ReceiverKind::Mutable => quote! { ::surrogate::typed::Proxy::get_mut(this) },
        };
        let call = fwd.finish_call(quote! {
            <#slot as #trait_ident>::#name #turbofish(#access #(, #args)*)
        });
        override_fns.push(quote! {
            #(#docs)*
            #[allow(unused_variables)]
            #sig {
                #call
            }
        });
    }

    let overrides_doc = format!(
        "Overridable members of [`{}`] for `surrogate::typed::Proxy<Self, Slot>`.\n\n\
         Every method forwards to the bound instance unless the declared type \
         redefines it.",
        trait_ident
    );
    let overrides_trait = quote! {
        #[doc = #overrides_doc]
        #vis trait #overrides_ident<#slot: #trait_ident>: ::core::marker::Sized {
            /// Names of the forwarded methods, in declaration order
            const MEMBERS: &'static [&'static str] = &[#(#member_names),*];

            #(#override_fns)*
        }
    };

    // impl Trait for Proxy<Declared, Slot>
    let proxy_methods = methods.iter().map(|fwd| {
        let sig = &fwd.sig;
        let name = fwd.name();
        let turbofish = &fwd.turbofish;
        let args = &fwd.args;
        let call = fwd.finish_call(quote! {
            <#declared as #overrides_ident<#slot>>::#name #turbofish(self #(, #args)*)
        });
        quote! {
            #sig {
                #call
            }
        }
    });
    let proxy_types = assoc_types.iter().map(|ident| {
        quote! { type #ident = <#slot as #trait_ident>::#ident; }
    });
    let proxy_consts = assoc_consts.iter().map(|(ident, ty)| {
        quote! { const #ident: #ty = <#slot as #trait_ident>::#ident; }
    });
    let proxy_impl = quote! {
        #unsafety impl<#declared, #slot> #trait_ident for ::surrogate::typed::Proxy<#declared, #slot>
        where
            #declared: #overrides_ident<#slot>,
            #slot: #trait_ident,
        {
            #(#proxy_types)*
            #(#proxy_consts)*
            #(#proxy_methods)*
        }
    };

    let pointer_impls = if args.pointers {
        let target = format_ident!("T");
        let pointer_impl = |pointer: TokenStream| {
            let types = assoc_types.iter().map(|ident| {
                quote! { type #ident = <#target as #trait_ident>::#ident; }
            });
            let consts = assoc_consts.iter().map(|(ident, ty)| {
                quote! { const #ident: #ty = <#target as #trait_ident>::#ident; }
            });
            let fns = methods.iter().map(|fwd| {
                let sig = &fwd.sig;
                let name = fwd.name();
                let turbofish = &fwd.turbofish;
                let args = &fwd.args;
                let access = match fwd.receiver {
                    ReceiverKind::Shared => quote! { &**self },
                    ReceiverKind::Mutable => quote! { &mut **self },
                };
                let call = fwd.finish_call(quote! {
                    <#target as #trait_ident>::#name #turbofish(#access #(, #args)*)
                });
                quote! {
                    #sig {
                        #call
                    }
                }
            });
            quote! {
                #unsafety impl<#target: #trait_ident + ?::core::marker::Sized> #trait_ident for #pointer {
                    #(#types)*
                    #(#consts)*
                    #(#fns)*
                }
            }
        };
        let by_ref = pointer_impl(quote! { &mut #target });
        let boxed = pointer_impl(quote! { ::std::boxed::Box<#target> });
        quote! { #by_ref #boxed }
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        #item
        #overrides_trait
        #proxy_impl
        #pointer_impls
    })
}
