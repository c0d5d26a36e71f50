//! Permission scope sets.
//!
//! A [`ScopeSet`] keeps scopes in insertion order and drops duplicates. Order
//! carries no meaning for the authorization server; it is kept only so URLs
//! and assertions are reproducible.

use serde::{Deserialize, Serialize};

/// Directory, reporting and administration scopes commonly granted to
/// delegated administrator tokens.
pub const ADMIN_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/admin.reports.audit.readonly",
    "https://www.googleapis.com/auth/admin.reports.usage.readonly",
    "https://www.googleapis.com/auth/apps.groups.settings",
    "https://www.googleapis.com/auth/androidmanagement",
    "https://www.googleapis.com/auth/apps.groups.migration",
    "https://www.googleapis.com/auth/admin.datatransfer",
    "https://www.googleapis.com/auth/cloudplatformprojects",
    "https://www.googleapis.com/auth/cloud_search",
    "https://www.googleapis.com/auth/apps.licensing",
    "https://www.googleapis.com/auth/admin.chrome.printers",
    "https://www.googleapis.com/auth/admin.directory.customer",
    "https://www.googleapis.com/auth/admin.directory.device.chromeos",
    "https://www.googleapis.com/auth/admin.directory.device.mobile",
    "https://www.googleapis.com/auth/admin.directory.domain",
    "https://www.googleapis.com/auth/admin.directory.group",
    "https://www.googleapis.com/auth/admin.directory.group.member",
    "https://www.googleapis.com/auth/admin.directory.orgunit",
    "https://www.googleapis.com/auth/admin.directory.resource.calendar",
    "https://www.googleapis.com/auth/admin.directory.rolemanagement",
    "https://www.googleapis.com/auth/admin.directory.user",
    "https://www.googleapis.com/auth/admin.directory.user.alias",
    "https://www.googleapis.com/auth/admin.directory.user.security",
    "https://www.googleapis.com/auth/admin.directory.userschema",
    "https://www.googleapis.com/auth/cloud-platform",
];

/// Per-user scopes typically delegated to a service identity.
pub const SERVICE_ACCOUNT_SCOPES: &[&str] = &[
    "https://mail.google.com/",
    "https://sites.google.com/feeds",
    "https://www.google.com/m8/feeds",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/activity",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/contacts",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/gmail.settings.basic",
    "https://www.googleapis.com/auth/gmail.settings.sharing",
];

/// An ordered, duplicate-free set of scope strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    /// Create an empty scope set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The [`ADMIN_SCOPES`] list.
    pub fn admin() -> Self {
        ADMIN_SCOPES.iter().copied().collect()
    }

    /// The [`SERVICE_ACCOUNT_SCOPES`] list.
    pub fn service_account() -> Self {
        SERVICE_ACCOUNT_SCOPES.iter().copied().collect()
    }

    /// Add a scope. Returns `false` if it was already present.
    pub fn insert(&mut self, scope: impl Into<String>) -> bool {
        let scope = scope.into();
        if scope.is_empty() || self.contains(&scope) {
            return false;
        }
        self.0.push(scope);
        true
    }

    /// Whether `scope` is in the set.
    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scopes joined with `separator` (space for OAuth requests).
    pub fn joined(&self, separator: &str) -> String {
        self.0.join(separator)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for ScopeSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for scope in iter {
            self.insert(scope);
        }
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(scopes: Vec<String>) -> Self {
        scopes.into_iter().collect()
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(set: ScopeSet) -> Self {
        set.0
    }
}

impl From<&[&str]> for ScopeSet {
    fn from(scopes: &[&str]) -> Self {
        scopes.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_drops_duplicates() {
        let mut set = ScopeSet::new();
        assert!(set.insert("a"));
        assert!(set.insert("b"));
        assert!(!set.insert("a"));
        assert!(!set.insert(""));
        assert_eq!(set.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_keeps_insertion_order() {
        let set: ScopeSet = ["z", "a", "m", "a"].into_iter().collect();
        assert_eq!(set.joined(" "), "z a m");
    }

    #[test]
    fn test_serde_as_plain_list() {
        let set: ScopeSet = serde_json::from_str(r#"["x","y","x"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["x","y"]"#);
    }

    #[test]
    fn test_default_lists_have_no_duplicates() {
        assert_eq!(ScopeSet::admin().len(), ADMIN_SCOPES.len());
        assert_eq!(ScopeSet::service_account().len(), SERVICE_ACCOUNT_SCOPES.len());
    }
}
