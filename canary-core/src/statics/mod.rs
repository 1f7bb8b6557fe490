//! Static (type-level) verification
//!
//! Type fixtures are usage fragments that must, or must not, type-check
//! against the declarations a dependency ships. They catch changes that are
//! invisible at runtime, such as a required field becoming optional.

mod checker;
mod declarations;
mod fragment;
mod verifier;

pub use checker::{StructuralChecker, TypeChecker, Verdict};
pub use declarations::{
    ClassDecl, DeclaredSymbol, Declarations, FieldDecl, FnDecl, ModuleDecl, ParamDecl, TypeDecl,
    TypeExpr,
};
pub use fragment::{ExpectedVerdict, Fragment, TypeCheckUnit};
pub use verifier::{StaticVerifier, TypeCheckOutcome, TypeCheckSummary, UnitStatus};
