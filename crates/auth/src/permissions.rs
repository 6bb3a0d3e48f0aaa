use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vocalyx_core::{DomainError, DomainResult};

/// Permission name.
///
/// Permissions are free-form keys (e.g. "view_orders"), not a closed set.
/// The only requirement is that a name is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PermissionName(Cow<'static, str>);

impl PermissionName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("permission name cannot be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionName {
    type Error = DomainError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.0.into_owned()
    }
}

impl core::borrow::Borrow<str> for PermissionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flattened `name -> granted` mapping, as embedded in session claims.
///
/// Serializes as a plain JSON object. Evaluation against it is advisory:
/// nothing in the backend gates an operation on these flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<PermissionName, bool>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, granted)` entries. A repeated name keeps the last flag.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PermissionName, bool)>,
    {
        Self(entries.into_iter().collect())
    }

    pub fn insert(&mut self, name: PermissionName, granted: bool) {
        self.0.insert(name, granted);
    }

    /// True only when the name is present *and* its flag is set.
    pub fn is_granted(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// The stored flag for `name`, `None` if the role never mentions it.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermissionName, bool)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &'static str) -> PermissionName {
        PermissionName::new(s).unwrap()
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(PermissionName::new("").is_err());
        assert!(PermissionName::new("  ").is_err());
        assert!(PermissionName::new("view_orders").is_ok());
    }

    #[test]
    fn denied_flag_is_not_a_grant() {
        let set = PermissionSet::from_entries([(name("view_orders"), true), (name("edit_orders"), false)]);

        assert!(set.is_granted("view_orders"));
        assert!(!set.is_granted("edit_orders"));
        assert!(!set.is_granted("delete_orders"));
        assert_eq!(set.get("edit_orders"), Some(false));
        assert_eq!(set.get("delete_orders"), None);
    }

    #[test]
    fn later_duplicate_wins() {
        let set = PermissionSet::from_entries([(name("export"), true), (name("export"), false)]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("export"), Some(false));
    }

    #[test]
    fn serializes_as_flat_object() {
        let set = PermissionSet::from_entries([(name("view_orders"), true)]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "view_orders": true }));

        let empty = serde_json::to_value(PermissionSet::new()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn decoding_rejects_blank_names() {
        let decoded: PermissionSet = serde_json::from_value(serde_json::json!({ "view_orders": true })).unwrap();
        assert!(decoded.is_granted("view_orders"));

        assert!(serde_json::from_value::<PermissionSet>(serde_json::json!({ " ": true })).is_err());
        assert!(serde_json::from_value::<PermissionName>(serde_json::json!("")).is_err());
    }
}
