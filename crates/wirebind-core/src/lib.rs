//! # wirebind-core
//!
//! Resolution engine for compile-time dependency injection.
//!
//! Handles:
//! - **Catalog**: Indexing `@Provides` members, provider passthroughs and
//!   parent components into a searchable binding catalog.
//! - **Cycle**: Tracking in-progress constructions and telling real cycles
//!   from ones broken by a function or `Lazy` wrapper.
//! - **Resolver**: Turning requested types into construction plans.
//! - **Optimizer**: Hoisting shared plan subtrees into reusable accessors.
//! - **Session**: Validating a component and driving the pipeline end to end.
//!
//! The source program is read through the [`ast::AstProvider`] trait;
//! [`ast::Program`] is an in-memory implementation front-ends lower into.

pub mod accessor;
pub mod annotations;
pub mod ast;
pub mod catalog;
pub mod context;
pub mod cycle;
pub mod diagnostics;
pub mod dump;
pub mod error;
pub mod names;
pub mod optimizer;
pub mod plan;
pub mod resolver;
pub mod session;
pub mod type_key;
