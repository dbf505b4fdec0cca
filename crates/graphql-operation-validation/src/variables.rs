use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    ops::{Deref, DerefMut},
};

use async_graphql_value::{ConstValue, Name};
use serde::{Deserialize, Deserializer, Serialize};

/// Variable bindings for a single execution of an operation, keyed by
/// variable name without the leading `$`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Variables(BTreeMap<Name, ConstValue>);

impl Display for Variables {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            write!(f, "{}{}: {}", if i == 0 { "" } else { ", " }, name, value)?;
        }
        f.write_str("}")
    }
}

impl<'de> Deserialize<'de> for Variables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(
            <Option<BTreeMap<Name, ConstValue>>>::deserialize(deserializer)?
                .unwrap_or_default()
                .into_iter()
                .collect(),
        )
    }
}

impl FromIterator<(Name, ConstValue)> for Variables {
    fn from_iter<T: IntoIterator<Item = (Name, ConstValue)>>(iter: T) -> Self {
        Variables(iter.into_iter().collect())
    }
}

impl Variables {
    /// Parses variables from a JSON object, treating anything that is not an
    /// object as an empty set of bindings.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Parses variables from a GraphQL const value, treating anything that is
    /// not an object as an empty set of bindings.
    pub fn from_value(value: ConstValue) -> Self {
        match value {
            ConstValue::Object(obj) => Variables(obj.into_iter().collect()),
            _ => Variables::default(),
        }
    }

    pub fn into_value(self) -> ConstValue {
        ConstValue::Object(self.0.into_iter().collect())
    }
}

impl From<Variables> for ConstValue {
    fn from(variables: Variables) -> Self {
        variables.into_value()
    }
}

impl Deref for Variables {
    type Target = BTreeMap<Name, ConstValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Variables {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_ignores_non_objects() {
        assert!(Variables::from_json(serde_json::json!(42)).is_empty());
        assert!(Variables::from_json(serde_json::Value::Null).is_empty());

        let variables = Variables::from_json(serde_json::json!({ "id": "1", "limit": 10 }));
        assert_eq!(variables.get("id"), Some(&ConstValue::String("1".to_string())));
        assert_eq!(variables.len(), 2);
    }

    #[test]
    fn display_is_stable() {
        let variables = Variables::from_json(serde_json::json!({ "b": 2, "a": 1 }));
        assert_eq!(variables.to_string(), "{a: 1, b: 2}");
    }
}
