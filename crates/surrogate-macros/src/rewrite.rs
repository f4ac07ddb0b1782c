// Signature rewriting for the generated overrides trait
//
// Inside `<Trait>Overrides`, `Self` is the declared type rather than the
// proxy, and the receiver becomes an ordinary `this` parameter. Types
// copied from the trait therefore need `Self::Assoc` redirected to the
// slot, and elided output lifetimes tied to `this` explicitly.

use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{
    parse_quote, Ident, Lifetime, ParenthesizedGenericArguments, PathSegment, Token, Type,
    TypeBareFn, TypeImplTrait, TypeReference,
};

/// Rewrites `Self::X` to `<Slot as Trait>::X`; records bare `Self`.
pub struct SelfPaths<'a> {
    pub trait_ident: &'a Ident,
    pub slot: &'a Ident,
    pub errors: Vec<syn::Error>,
}

impl<'a> SelfPaths<'a> {
    pub fn new(trait_ident: &'a Ident, slot: &'a Ident) -> Self {
        SelfPaths {
            trait_ident,
            slot,
            errors: Vec::new(),
        }
    }

    /// Combine recorded errors into one
    pub fn finish(self) -> syn::Result<()> {
        let mut errors = self.errors.into_iter();
        match errors.next() {
            None => Ok(()),
            Some(mut first) => {
                for err in errors {
                    first.combine(err);
                }
                Err(first)
            }
        }
    }
}

impl VisitMut for SelfPaths<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(type_path) = ty {
            let starts_with_self = type_path.qself.is_none()
                && type_path
                    .path
                    .segments
                    .first()
                    .is_some_and(|seg| seg.ident == "Self");
            if starts_with_self {
                if type_path.path.segments.len() == 1 {
                    self.errors.push(syn::Error::new_spanned(
                        &*type_path,
                        "`Self` cannot be forwarded through a proxy; only `Self::Assoc` paths are supported",
                    ));
                    return;
                }
                let rest: Punctuated<PathSegment, Token![::]> =
                    type_path.path.segments.iter().skip(1).cloned().collect();
                let slot = self.slot;
                let trait_ident = self.trait_ident;
                *ty = parse_quote!(<#slot as #trait_ident>::#rest);
                return;
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }
}

/// Gives elided lifetimes the receiver's lifetime, as method elision would.
pub struct ElidedLifetimes {
    pub lifetime: Lifetime,
}

impl VisitMut for ElidedLifetimes {
    fn visit_type_reference_mut(&mut self, reference: &mut TypeReference) {
        if reference.lifetime.is_none() {
            reference.lifetime = Some(self.lifetime.clone());
        }
        visit_mut::visit_type_reference_mut(self, reference);
    }

    fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
        if lifetime.ident == "_" {
            *lifetime = self.lifetime.clone();
        }
    }

    // Fn sugar and fn pointers have their own elision scope.
    fn visit_parenthesized_generic_arguments_mut(&mut self, _: &mut ParenthesizedGenericArguments) {}

    fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}
}

/// Finds `impl Trait` in argument position.
#[derive(Default)]
pub struct ImplTraitFinder {
    pub found: Option<syn::Error>,
}

impl VisitMut for ImplTraitFinder {
    fn visit_type_impl_trait_mut(&mut self, impl_trait: &mut TypeImplTrait) {
        if self.found.is_none() {
            self.found = Some(syn::Error::new_spanned(
                &*impl_trait,
                "`impl Trait` arguments cannot be forwarded; use a named type parameter",
            ));
        }
    }
}
