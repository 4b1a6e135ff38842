//! The type algebra for string diagrams.
//!
//! Types are the objects of a symmetric monoidal category: base types,
//! binary tensors, linear function types, and the monoidal unit `I`.
//! Equality is structural; associativity, unit, and symmetry laws are
//! never applied implicitly.
//!
//! [`SchemaTy`] extends the grammar with type variables and is used only
//! inside structural-node schemas and rewrite-rule patterns. Resolution
//! is first-order matching against a concrete [`Ty`] with fresh
//! variables per use site; there are no higher-order positions, so full
//! unification is intentionally not implemented.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A diagram type: an object of the monoidal category.
///
/// Immutable after construction and compared structurally, so
/// `A ⊗ (B ⊗ C)` and `(A ⊗ B) ⊗ C` are *different* types. Re-bracketing
/// is expressed by explicit associator nodes, never by the equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ty {
    /// A named base type, declared by the surrounding document.
    Base(String),

    /// The tensor (parallel composition) of two types.
    Tensor(Box<Ty>, Box<Ty>),

    /// A linear function type from domain to codomain.
    Hom(Box<Ty>, Box<Ty>),

    /// The monoidal unit `I`.
    Unit,
}

impl Ty {
    /// Creates a base type with the given name.
    pub fn base(name: impl Into<String>) -> Self {
        Ty::Base(name.into())
    }

    /// Creates the tensor of two types.
    pub fn tensor(left: Ty, right: Ty) -> Self {
        Ty::Tensor(Box::new(left), Box::new(right))
    }

    /// Creates a linear function type.
    pub fn hom(domain: Ty, codomain: Ty) -> Self {
        Ty::Hom(Box::new(domain), Box::new(codomain))
    }

    /// Printing precedence: higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Ty::Hom(..) => 0,
            Ty::Tensor(..) => 1,
            Ty::Base(_) | Ty::Unit => 2,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        let parens = self.precedence() < min;
        if parens {
            write!(f, "(")?;
        }
        match self {
            Ty::Base(name) => write!(f, "{name}")?,
            // Tensor is a binary constructor with no implicit
            // associativity, so nested tensors are parenthesized.
            Ty::Tensor(l, r) => {
                l.fmt_prec(f, 2)?;
                write!(f, " ⊗ ")?;
                r.fmt_prec(f, 2)?;
            }
            Ty::Hom(d, c) => {
                d.fmt_prec(f, 1)?;
                write!(f, " -> ")?;
                c.fmt_prec(f, 0)?;
            }
            Ty::Unit => write!(f, "I")?,
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

/// A type variable appearing in a schema or rewrite pattern.
///
/// Variables are named statically because every schema in the system is
/// built-in data; scoping is per use site (each structural node or rule
/// match starts from an empty substitution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TyVar(pub &'static str);

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A substitution from type variables to concrete types.
///
/// `BTreeMap` keeps iteration deterministic for diagnostics.
pub type Subst = BTreeMap<TyVar, Ty>;

/// A type template: the [`Ty`] grammar restricted to the constructors
/// schemas actually use, plus variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaTy {
    /// A variable standing for any type, including `I`.
    Var(TyVar),

    /// The literal unit type.
    Unit,

    /// A tensor of two templates.
    Tensor(Box<SchemaTy>, Box<SchemaTy>),
}

impl SchemaTy {
    /// Shorthand for a variable template.
    pub fn var(name: &'static str) -> Self {
        SchemaTy::Var(TyVar(name))
    }

    /// Shorthand for a tensor template.
    pub fn tensor(left: SchemaTy, right: SchemaTy) -> Self {
        SchemaTy::Tensor(Box::new(left), Box::new(right))
    }

    /// First-order matching of this template against a concrete type.
    ///
    /// On success the substitution is extended; a variable already bound
    /// to a different type makes the match fail. On failure the
    /// substitution may hold partial bindings, so callers that need a
    /// clean retry should match into a scratch copy.
    pub fn matches(&self, ty: &Ty, subst: &mut Subst) -> bool {
        match self {
            SchemaTy::Var(v) => match subst.get(v) {
                Some(bound) => bound == ty,
                None => {
                    subst.insert(*v, ty.clone());
                    true
                }
            },
            SchemaTy::Unit => *ty == Ty::Unit,
            SchemaTy::Tensor(l, r) => match ty {
                Ty::Tensor(tl, tr) => l.matches(tl, subst) && r.matches(tr, subst),
                _ => false,
            },
        }
    }

    /// Substitutes bound variables, producing a concrete type.
    ///
    /// Returns `None` when any variable is unbound; the caller reports
    /// that as an underconstrained schema rather than guessing.
    pub fn apply(&self, subst: &Subst) -> Option<Ty> {
        match self {
            SchemaTy::Var(v) => subst.get(v).cloned(),
            SchemaTy::Unit => Some(Ty::Unit),
            SchemaTy::Tensor(l, r) => Some(Ty::tensor(l.apply(subst)?, r.apply(subst)?)),
        }
    }
}

impl fmt::Display for SchemaTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaTy::Var(v) => write!(f, "{v}"),
            SchemaTy::Unit => write!(f, "I"),
            SchemaTy::Tensor(l, r) => {
                let paren = |t: &SchemaTy| matches!(t, SchemaTy::Tensor(..));
                if paren(l) {
                    write!(f, "({l})")?;
                } else {
                    write!(f, "{l}")?;
                }
                write!(f, " ⊗ ")?;
                if paren(r) {
                    write!(f, "({r})")
                } else {
                    write!(f, "{r}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> (Ty, Ty, Ty) {
        (Ty::base("A"), Ty::base("B"), Ty::base("C"))
    }

    #[test]
    fn test_structural_equality_rejects_rebracketing() {
        let (a, b, c) = abc();
        let left = Ty::tensor(Ty::tensor(a.clone(), b.clone()), c.clone());
        let right = Ty::tensor(a, Ty::tensor(b, c));
        assert_ne!(left, right);
    }

    #[test]
    fn test_display_precedence() {
        let (a, b, c) = abc();
        assert_eq!(Ty::tensor(a.clone(), b.clone()).to_string(), "A ⊗ B");
        assert_eq!(
            Ty::tensor(Ty::tensor(a.clone(), b.clone()), c.clone()).to_string(),
            "(A ⊗ B) ⊗ C"
        );
        assert_eq!(
            Ty::hom(Ty::tensor(a.clone(), b.clone()), c.clone()).to_string(),
            "A ⊗ B -> C"
        );
        assert_eq!(
            Ty::tensor(Ty::hom(a.clone(), b.clone()), c).to_string(),
            "(A -> B) ⊗ C"
        );
        assert_eq!(Ty::Unit.to_string(), "I");
    }

    #[test]
    fn test_match_binds_variables() {
        let (a, b, _) = abc();
        let schema = SchemaTy::tensor(SchemaTy::var("X"), SchemaTy::var("Y"));
        let mut subst = Subst::new();
        assert!(schema.matches(&Ty::tensor(a.clone(), b.clone()), &mut subst));
        assert_eq!(subst.get(&TyVar("X")), Some(&a));
        assert_eq!(subst.get(&TyVar("Y")), Some(&b));
    }

    #[test]
    fn test_match_rejects_inconsistent_binding() {
        let (a, b, _) = abc();
        let schema = SchemaTy::tensor(SchemaTy::var("X"), SchemaTy::var("X"));
        let mut subst = Subst::new();
        assert!(!schema.matches(&Ty::tensor(a, b), &mut subst));
    }

    #[test]
    fn test_match_unit_is_literal() {
        let mut subst = Subst::new();
        assert!(SchemaTy::Unit.matches(&Ty::Unit, &mut subst));
        assert!(!SchemaTy::Unit.matches(&Ty::base("A"), &mut subst));
        // A variable may still stand for I.
        assert!(SchemaTy::var("X").matches(&Ty::Unit, &mut subst));
    }

    #[test]
    fn test_apply_requires_all_variables_bound() {
        let schema = SchemaTy::tensor(SchemaTy::var("X"), SchemaTy::var("Y"));
        let mut subst = Subst::new();
        subst.insert(TyVar("X"), Ty::base("A"));
        assert_eq!(schema.apply(&subst), None);
        subst.insert(TyVar("Y"), Ty::Unit);
        assert_eq!(
            schema.apply(&subst),
            Some(Ty::tensor(Ty::base("A"), Ty::Unit))
        );
    }
}
