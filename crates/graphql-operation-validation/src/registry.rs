//! An immutable, validation-oriented view of a schema.
//!
//! The registry is built once from a parsed SDL document and answers the
//! lookups the visitors need: root operation types, type and directive
//! definitions by name, fields and their arguments, and possible-type sets
//! for abstract types. Type references are kept in their SDL string spelling
//! (`[Pet!]!`) and inspected through [`MetaTypeName`](crate::MetaTypeName).

use async_graphql_parser::{
    types::{self, DirectiveLocation, ServiceDocument, TypeKind, TypeSystemDefinition},
    Pos, Positioned,
};
use async_graphql_value::ConstValue;
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema parse error: {0}")]
    Parse(#[from] async_graphql_parser::Error),
    #[error("duplicate definition of type \"{0}\"")]
    DuplicateType(String),
    #[error("duplicate definition of directive \"@{0}\"")]
    DuplicateDirective(String),
    #[error("extension of undefined type \"{0}\"")]
    UnknownTypeExtension(String),
    #[error("the schema does not define a query root type")]
    MissingQueryType,
}

#[derive(Debug)]
pub struct MetaField {
    pub name: String,
    pub args: Vec<MetaInputValue>,
    /// Type reference in SDL spelling, e.g. `[Pet!]!`.
    pub ty: String,
}

impl MetaField {
    pub fn argument(&self, name: &str) -> Option<&MetaInputValue> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

#[derive(Debug)]
pub struct MetaInputValue {
    pub name: String,
    pub ty: String,
    pub default_value: Option<ConstValue>,
}

#[derive(Debug)]
pub struct MetaDirective {
    pub name: String,
    pub locations: Vec<DirectiveLocation>,
    pub args: Vec<MetaInputValue>,
    pub is_repeatable: bool,
}

impl MetaDirective {
    pub fn argument(&self, name: &str) -> Option<&MetaInputValue> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

#[derive(Debug)]
pub enum MetaType {
    Scalar {
        name: String,
    },
    Object {
        name: String,
        fields: IndexMap<String, MetaField>,
        implements: IndexSet<String>,
    },
    Interface {
        name: String,
        fields: IndexMap<String, MetaField>,
        /// Names of the object types implementing this interface.
        possible_types: IndexSet<String>,
    },
    Union {
        name: String,
        possible_types: IndexSet<String>,
    },
    Enum {
        name: String,
        values: IndexSet<String>,
    },
    InputObject {
        name: String,
        input_fields: IndexMap<String, MetaInputValue>,
    },
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar { name }
            | MetaType::Object { name, .. }
            | MetaType::Interface { name, .. }
            | MetaType::Union { name, .. }
            | MetaType::Enum { name, .. }
            | MetaType::InputObject { name, .. } => name,
        }
    }

    pub fn field(&self, name: &str) -> Option<&MetaField> {
        match self {
            MetaType::Object { fields, .. } | MetaType::Interface { fields, .. } => {
                fields.get(name)
            }
            _ => None,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        let fields = match self {
            MetaType::Object { fields, .. } | MetaType::Interface { fields, .. } => Some(fields),
            _ => None,
        };
        fields.into_iter().flat_map(|fields| fields.keys().map(String::as_str))
    }

    pub fn input_field(&self, name: &str) -> Option<&MetaInputValue> {
        match self {
            MetaType::InputObject { input_fields, .. } => input_fields.get(name),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            MetaType::Object { .. } | MetaType::Interface { .. } | MetaType::Union { .. }
        )
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface { .. } | MetaType::Union { .. })
    }

    pub fn is_object(&self) -> bool {
        matches!(self, MetaType::Object { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar { .. } | MetaType::Enum { .. })
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            MetaType::Scalar { .. } | MetaType::Enum { .. } | MetaType::InputObject { .. }
        )
    }
}

#[derive(Debug)]
pub struct Schema {
    types: IndexMap<String, MetaType>,
    directives: IndexMap<String, MetaDirective>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Schema {
    /// Parses an SDL string and builds the registry from it.
    pub fn parse(sdl: &str) -> Result<Schema, SchemaError> {
        let document = async_graphql_parser::parse_schema(sdl)?;
        let mut schema = Schema::build(&document)?;
        for definition in &document.definitions {
            if let TypeSystemDefinition::Directive(directive) = definition {
                if let Some(meta) = schema.directives.get_mut(directive.node.name.node.as_str()) {
                    meta.is_repeatable = directive_is_repeatable(sdl, directive);
                }
            }
        }
        Ok(schema)
    }

    /// Builds the registry from an already parsed SDL document.
    ///
    /// The parsed AST does not reliably record the `repeatable` keyword, so
    /// directives built this way are treated as non-repeatable; prefer
    /// [`Schema::parse`] when the SDL declares repeatable directives.
    pub fn build(document: &ServiceDocument) -> Result<Schema, SchemaError> {
        SchemaBuilder::default().build(document)
    }

    pub fn query_type(&self) -> &MetaType {
        // The builder refuses to construct a schema without a query root.
        &self.types[self.query_type.as_str()]
    }

    pub fn mutation_type(&self) -> Option<&MetaType> {
        self.mutation_type.as_deref().and_then(|name| self.types.get(name))
    }

    pub fn subscription_type(&self) -> Option<&MetaType> {
        self.subscription_type.as_deref().and_then(|name| self.types.get(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn directive(&self, name: &str) -> Option<&MetaDirective> {
        self.directives.get(name)
    }

    /// Whether two composite types can both apply to a single runtime object,
    /// i.e. their possible-type sets intersect.
    pub fn type_overlap(&self, left: &MetaType, right: &MetaType) -> bool {
        if left.name() == right.name() {
            return true;
        }
        self.possible_type_names(left)
            .iter()
            .any(|name| self.possible_type_names(right).contains(*name))
    }

    fn possible_type_names<'a>(&self, ty: &'a MetaType) -> IndexSet<&'a str> {
        match ty {
            MetaType::Object { name, .. } => std::iter::once(name.as_str()).collect(),
            MetaType::Interface { possible_types, .. } | MetaType::Union { possible_types, .. } => {
                possible_types.iter().map(String::as_str).collect()
            }
            _ => IndexSet::new(),
        }
    }
}

/// Whether a directive definition carries the `repeatable` keyword.
///
/// Between the directive's name and its `on` keyword the grammar only allows
/// the argument list and `repeatable`, so the first bare identifier after the
/// name (skipping parenthesized arguments, strings and comments) is either
/// `repeatable` or `on` itself.
fn directive_is_repeatable(
    sdl: &str,
    definition: &Positioned<types::DirectiveDefinition>,
) -> bool {
    let name = &definition.node.name;
    let Some(start) = byte_offset(sdl, name.pos) else {
        return false;
    };
    let after_name = &sdl[start + name.node.as_str().len()..];
    next_bare_identifier(after_name) == Some("repeatable")
}

fn byte_offset(source: &str, pos: Pos) -> Option<usize> {
    let mut offset = 0;
    for (i, line) in source.split_inclusive('\n').enumerate() {
        if i + 1 == pos.line {
            let (column_offset, _) = line.char_indices().nth(pos.column.checked_sub(1)?)?;
            return Some(offset + column_offset);
        }
        offset += line.len();
    }
    None
}

/// The first identifier outside parentheses, strings and comments.
fn next_bare_identifier(source: &str) -> Option<&str> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'"' => {
                if bytes[i..].starts_with(b"\"\"\"") {
                    i += 3;
                    while i < bytes.len() && !bytes[i..].starts_with(b"\"\"\"") {
                        i += 1;
                    }
                    i = (i + 3).min(bytes.len());
                } else {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        i += if bytes[i] == b'\\' { 2 } else { 1 };
                    }
                    i += 1;
                }
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            c if depth == 0 && (c == b'_' || c.is_ascii_alphabetic()) => {
                let word_start = i;
                while i < bytes.len() && (bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                return Some(&source[word_start..i]);
            }
            _ => i += 1,
        }
    }
    None
}

#[derive(Default)]
struct SchemaBuilder {
    types: IndexMap<String, MetaType>,
    directives: IndexMap<String, MetaDirective>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl SchemaBuilder {
    fn build(mut self, document: &ServiceDocument) -> Result<Schema, SchemaError> {
        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            self.types.insert(name.to_string(), MetaType::Scalar { name: name.to_string() });
        }

        // Definitions first, extensions once every base type exists.
        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Type(ty) if !ty.node.extend => self.insert_type(&ty.node)?,
                TypeSystemDefinition::Directive(directive) => {
                    self.insert_directive(&directive.node)?;
                }
                TypeSystemDefinition::Schema(schema) => {
                    if let Some(query) = &schema.node.query {
                        self.query_type = Some(query.node.to_string());
                    }
                    if let Some(mutation) = &schema.node.mutation {
                        self.mutation_type = Some(mutation.node.to_string());
                    }
                    if let Some(subscription) = &schema.node.subscription {
                        self.subscription_type = Some(subscription.node.to_string());
                    }
                }
                TypeSystemDefinition::Type(_) => {}
            }
        }
        for definition in &document.definitions {
            if let TypeSystemDefinition::Type(ty) = definition {
                if ty.node.extend {
                    self.extend_type(&ty.node)?;
                }
            }
        }

        self.link_interface_implementors();
        self.insert_builtin_directives();

        let query_type = self
            .query_type
            .or_else(|| self.types.contains_key("Query").then(|| "Query".to_string()))
            .filter(|name| self.types.contains_key(name.as_str()))
            .ok_or(SchemaError::MissingQueryType)?;
        let mutation_type = self
            .mutation_type
            .or_else(|| self.types.contains_key("Mutation").then(|| "Mutation".to_string()));
        let subscription_type = self.subscription_type.or_else(|| {
            self.types.contains_key("Subscription").then(|| "Subscription".to_string())
        });

        Ok(Schema {
            types: self.types,
            directives: self.directives,
            query_type,
            mutation_type,
            subscription_type,
        })
    }

    fn insert_type(&mut self, definition: &types::TypeDefinition) -> Result<(), SchemaError> {
        let name = definition.name.node.to_string();
        let ty = Self::convert_type(&name, &definition.kind);
        // Redefining a built-in scalar is tolerated, other duplicates are not.
        let was_builtin_scalar = matches!(self.types.get(name.as_str()), Some(MetaType::Scalar { .. }))
            && matches!(ty, MetaType::Scalar { .. });
        if self.types.insert(name.clone(), ty).is_some() && !was_builtin_scalar {
            return Err(SchemaError::DuplicateType(name));
        }
        Ok(())
    }

    fn convert_type(name: &str, kind: &TypeKind) -> MetaType {
        let name = name.to_string();
        match kind {
            TypeKind::Scalar => MetaType::Scalar { name },
            TypeKind::Object(object) => MetaType::Object {
                name,
                fields: Self::convert_fields(&object.fields),
                implements: object.implements.iter().map(|name| name.node.to_string()).collect(),
            },
            TypeKind::Interface(interface) => MetaType::Interface {
                name,
                fields: Self::convert_fields(&interface.fields),
                possible_types: IndexSet::new(),
            },
            TypeKind::Union(union) => MetaType::Union {
                name,
                possible_types: union.members.iter().map(|name| name.node.to_string()).collect(),
            },
            TypeKind::Enum(enum_type) => MetaType::Enum {
                name,
                values: enum_type
                    .values
                    .iter()
                    .map(|value| value.node.value.node.to_string())
                    .collect(),
            },
            TypeKind::InputObject(input_object) => MetaType::InputObject {
                name,
                input_fields: input_object
                    .fields
                    .iter()
                    .map(|field| {
                        (field.node.name.node.to_string(), Self::convert_input_value(&field.node))
                    })
                    .collect(),
            },
        }
    }

    fn convert_fields(
        fields: &[Positioned<types::FieldDefinition>],
    ) -> IndexMap<String, MetaField> {
        fields
            .iter()
            .map(|field| {
                (
                    field.node.name.node.to_string(),
                    MetaField {
                        name: field.node.name.node.to_string(),
                        args: field
                            .node
                            .arguments
                            .iter()
                            .map(|arg| Self::convert_input_value(&arg.node))
                            .collect(),
                        ty: field.node.ty.node.to_string(),
                    },
                )
            })
            .collect()
    }

    fn convert_input_value(value: &types::InputValueDefinition) -> MetaInputValue {
        MetaInputValue {
            name: value.name.node.to_string(),
            ty: value.ty.node.to_string(),
            default_value: value.default_value.as_ref().map(|value| value.node.clone()),
        }
    }

    fn extend_type(&mut self, definition: &types::TypeDefinition) -> Result<(), SchemaError> {
        let name = definition.name.node.as_str();
        let Some(existing) = self.types.get_mut(name) else {
            return Err(SchemaError::UnknownTypeExtension(name.to_string()));
        };
        match (existing, &definition.kind) {
            (MetaType::Object { fields, implements, .. }, TypeKind::Object(object)) => {
                fields.extend(Self::convert_fields(&object.fields));
                implements.extend(object.implements.iter().map(|name| name.node.to_string()));
            }
            (MetaType::Interface { fields, .. }, TypeKind::Interface(interface)) => {
                fields.extend(Self::convert_fields(&interface.fields));
            }
            (MetaType::Union { possible_types, .. }, TypeKind::Union(union)) => {
                possible_types.extend(union.members.iter().map(|name| name.node.to_string()));
            }
            (MetaType::Enum { values, .. }, TypeKind::Enum(enum_type)) => {
                values.extend(
                    enum_type.values.iter().map(|value| value.node.value.node.to_string()),
                );
            }
            (MetaType::InputObject { input_fields, .. }, TypeKind::InputObject(input_object)) => {
                input_fields.extend(input_object.fields.iter().map(|field| {
                    (field.node.name.node.to_string(), Self::convert_input_value(&field.node))
                }));
            }
            _ => return Err(SchemaError::UnknownTypeExtension(name.to_string())),
        }
        Ok(())
    }

    fn link_interface_implementors(&mut self) {
        let mut implementors: IndexMap<String, Vec<String>> = IndexMap::new();
        for ty in self.types.values() {
            if let MetaType::Object { name, implements, .. } = ty {
                for interface in implements {
                    implementors.entry(interface.clone()).or_default().push(name.clone());
                }
            }
        }
        for (interface, objects) in implementors {
            if let Some(MetaType::Interface { possible_types, .. }) =
                self.types.get_mut(interface.as_str())
            {
                possible_types.extend(objects);
            }
        }
    }

    fn insert_directive(
        &mut self,
        definition: &types::DirectiveDefinition,
    ) -> Result<(), SchemaError> {
        let name = definition.name.node.to_string();
        let directive = MetaDirective {
            name: name.clone(),
            locations: definition.locations.iter().map(|location| location.node).collect(),
            args: definition
                .arguments
                .iter()
                .map(|arg| Self::convert_input_value(&arg.node))
                .collect(),
            // `async-graphql-parser` reports every directive definition as
            // repeatable (its optional `repeatable` rule always matches), so
            // the keyword is re-read from the source text in `Schema::parse`.
            is_repeatable: false,
        };
        if self.directives.insert(name.clone(), directive).is_some() {
            return Err(SchemaError::DuplicateDirective(name));
        }
        Ok(())
    }

    fn insert_builtin_directives(&mut self) {
        let conditional_arg = || MetaInputValue {
            name: "if".to_string(),
            ty: "Boolean!".to_string(),
            default_value: None,
        };
        let executable_selections = vec![
            DirectiveLocation::Field,
            DirectiveLocation::FragmentSpread,
            DirectiveLocation::InlineFragment,
        ];
        let builtins = [
            MetaDirective {
                name: "skip".to_string(),
                locations: executable_selections.clone(),
                args: vec![conditional_arg()],
                is_repeatable: false,
            },
            MetaDirective {
                name: "include".to_string(),
                locations: executable_selections,
                args: vec![conditional_arg()],
                is_repeatable: false,
            },
            MetaDirective {
                name: "deprecated".to_string(),
                locations: vec![
                    DirectiveLocation::FieldDefinition,
                    DirectiveLocation::ArgumentDefinition,
                    DirectiveLocation::InputFieldDefinition,
                    DirectiveLocation::EnumValue,
                ],
                args: vec![MetaInputValue {
                    name: "reason".to_string(),
                    ty: "String".to_string(),
                    default_value: Some(ConstValue::String("No longer supported".to_string())),
                }],
                is_repeatable: false,
            },
            MetaDirective {
                name: "specifiedBy".to_string(),
                locations: vec![DirectiveLocation::Scalar],
                args: vec![MetaInputValue {
                    name: "url".to_string(),
                    ty: "String!".to_string(),
                    default_value: None,
                }],
                is_repeatable: false,
            },
        ];
        for directive in builtins {
            if !self.directives.contains_key(directive.name.as_str()) {
                self.directives.insert(directive.name.clone(), directive);
            }
        }
    }
}
