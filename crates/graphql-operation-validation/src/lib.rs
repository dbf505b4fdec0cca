//! Validation of executable GraphQL documents against a schema.
//!
//! The crate parses nothing itself: it takes a schema view built from an SDL
//! document and an already parsed operation document, walks the document once
//! and reports every rule violation it finds. [`validate`] runs the default
//! rule set; callers with different needs can assemble their own chain with
//! [`VisitorNil::with`] and [`visit`].
//!
//! ```
//! use graphql_operation_validation::{validate, Schema};
//!
//! let schema = Schema::parse("type Query { hello(name: String): String }")?;
//! let doc = async_graphql_parser::parse_query("{ hello(name: 1) }")?;
//!
//! let result = validate(&schema, &doc, None);
//! assert!(!result.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
mod test_harness;

mod registry;
pub mod rules;
mod suggestion;
mod type_name;
mod utils;
mod variables;
mod visitor;

pub use async_graphql_parser::Pos;
pub use registry::{MetaDirective, MetaField, MetaInputValue, MetaType, Schema, SchemaError};
pub use type_name::MetaTypeName;
pub use variables::Variables;
pub use visitor::{
    visit, InputType, RuleError, Visitor, VisitorCons, VisitorContext, VisitorNil,
};

use async_graphql_parser::types::ExecutableDocument;

/// The outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<RuleError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the default rule set over a document.
///
/// Variable bindings are optional: when given, value checks coerce variable
/// references through them, and checks on values whose variables are unbound
/// are skipped rather than guessed at.
pub fn validate(
    schema: &Schema,
    doc: &ExecutableDocument,
    variables: Option<&Variables>,
) -> ValidationResult {
    let mut ctx = VisitorContext::new(schema, doc, variables);
    let mut visitor = VisitorNil
        .with(rules::ArgumentsOfCorrectType)
        .with(rules::DefaultValuesOfCorrectType)
        .with(rules::FieldsOnCorrectType)
        .with(rules::FragmentsOnCompositeTypes)
        .with(rules::KnownArgumentNames::default())
        .with(rules::NoFragmentCycles::default())
        .with(rules::KnownFragmentNames)
        .with(rules::KnownTypeNames)
        .with(rules::NoUndefinedVariables::default())
        .with(rules::NoUnusedFragments::default())
        .with(rules::NoUnusedVariables::default())
        .with(rules::UniqueArgumentNames::default())
        .with(rules::UniqueVariableNames::default())
        .with(rules::VariablesAreInputTypes)
        .with(rules::VariableInAllowedPosition::default())
        .with(rules::ScalarLeafs)
        .with(rules::PossibleFragmentSpreads)
        .with(rules::ProvidedNonNullArguments)
        .with(rules::KnownDirectives::default())
        .with(rules::DirectivesUnique)
        .with(rules::SingleFieldSubscriptions)
        .with(rules::OverlappingFieldsCanBeMerged::default());
    visit(&mut visitor, &mut ctx, doc);
    ValidationResult { errors: ctx.errors }
}
