use std::fmt;

/// Borrowed view over a type reference string such as `[Pet!]!`.
///
/// Type references in the schema are stored as strings in their SDL spelling,
/// so wrappers can be peeled off by slicing: stripping the trailing `!` of a
/// non-null or the surrounding brackets of a list yields the inner reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaTypeName<'a> {
    List(&'a str),
    NonNull(&'a str),
    Named(&'a str),
}

impl fmt::Display for MetaTypeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaTypeName::List(inner) => write!(f, "[{inner}]"),
            MetaTypeName::NonNull(inner) => write!(f, "{inner}!"),
            MetaTypeName::Named(name) => write!(f, "{name}"),
        }
    }
}

impl<'a> MetaTypeName<'a> {
    pub fn create(type_name: &str) -> MetaTypeName<'_> {
        if let Some(inner) = type_name.strip_suffix('!') {
            MetaTypeName::NonNull(inner)
        } else if type_name.starts_with('[') && type_name.ends_with(']') {
            MetaTypeName::List(&type_name[1..type_name.len() - 1])
        } else {
            MetaTypeName::Named(type_name)
        }
    }

    /// The innermost named type, with all list and non-null wrappers removed.
    pub fn concrete_typename(type_name: &str) -> &str {
        match MetaTypeName::create(type_name) {
            MetaTypeName::List(inner) | MetaTypeName::NonNull(inner) => {
                MetaTypeName::concrete_typename(inner)
            }
            MetaTypeName::Named(name) => name,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, MetaTypeName::NonNull(_))
    }

    pub fn unwrap_non_null(&self) -> MetaTypeName<'a> {
        match self {
            MetaTypeName::NonNull(inner) => MetaTypeName::create(inner),
            ty => *ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MetaTypeName;

    #[test]
    fn peels_wrappers_one_layer_at_a_time() {
        assert_eq!(MetaTypeName::create("Pet"), MetaTypeName::Named("Pet"));
        assert_eq!(MetaTypeName::create("Pet!"), MetaTypeName::NonNull("Pet"));
        assert_eq!(MetaTypeName::create("[Pet!]"), MetaTypeName::List("Pet!"));
        assert_eq!(MetaTypeName::create("[Pet!]!"), MetaTypeName::NonNull("[Pet!]"));
    }

    #[test]
    fn concrete_typename_strips_all_wrappers() {
        assert_eq!(MetaTypeName::concrete_typename("[[Pet!]!]!"), "Pet");
        assert_eq!(MetaTypeName::concrete_typename("Int"), "Int");
    }

    #[test]
    fn display_round_trips() {
        for ty in ["Pet", "Pet!", "[Pet!]", "[[Int]!]!"] {
            assert_eq!(MetaTypeName::create(ty).to_string(), ty);
        }
    }
}
