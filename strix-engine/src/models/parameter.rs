//! Plugin parameters and their scoped values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Str => "str",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::List => "list",
            ParamKind::Dict => "dict",
        }
    }
}

/// A named, typed input a plugin declares it needs
///
/// A parameter belongs to exactly one plugin configuration: it only exists
/// inside a [`super::PluginConfig`]'s parameter list, so the "one owning
/// config" invariant holds by construction. Identity is
/// `(plugin name, parameter name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub description: String,
    /// Secrets resolve like any other parameter but are never logged by value
    #[serde(default)]
    pub is_secret: bool,
    /// A required parameter with no resolvable value makes the plugin not
    /// runnable for that user
    #[serde(default)]
    pub required: bool,
}

/// Who contributed a candidate value
///
/// At most one value exists per `(plugin, parameter, scope)`; a later upsert
/// for the same scope replaces the earlier value (latest wins, not versioned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ValueScope {
    /// A specific user's own value
    User { user_id: Uuid },
    /// Shared by an organization's members
    Organization { org_id: Uuid },
    /// System default, applies to everyone
    Default,
}

impl ValueScope {
    /// Column pair used for persistence: a discriminant and an id
    /// (empty string for the default scope).
    pub fn columns(&self) -> (&'static str, String) {
        match self {
            ValueScope::User { user_id } => ("user", user_id.to_string()),
            ValueScope::Organization { org_id } => ("organization", org_id.to_string()),
            ValueScope::Default => ("default", String::new()),
        }
    }

    /// Inverse of [`columns`](Self::columns)
    pub fn from_columns(scope: &str, scope_id: &str) -> Option<Self> {
        match scope {
            "user" => Uuid::parse_str(scope_id)
                .ok()
                .map(|user_id| ValueScope::User { user_id }),
            "organization" => Uuid::parse_str(scope_id)
                .ok()
                .map(|org_id| ValueScope::Organization { org_id }),
            "default" => Some(ValueScope::Default),
            _ => None,
        }
    }
}

/// A concrete candidate value for a parameter, contributed by one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterValue {
    pub plugin: String,
    pub parameter: String,
    pub scope: ValueScope,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_round_trips_through_columns() {
        let scopes = [
            ValueScope::User {
                user_id: Uuid::new_v4(),
            },
            ValueScope::Organization {
                org_id: Uuid::new_v4(),
            },
            ValueScope::Default,
        ];
        for scope in scopes {
            let (kind, id) = scope.columns();
            assert_eq!(ValueScope::from_columns(kind, &id), Some(scope));
        }
    }

    #[test]
    fn unknown_scope_discriminant_is_rejected() {
        assert_eq!(ValueScope::from_columns("group", ""), None);
        assert_eq!(ValueScope::from_columns("user", "not-a-uuid"), None);
    }
}
