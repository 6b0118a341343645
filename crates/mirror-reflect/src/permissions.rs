//! Reflection Permissions
//!
//! Controls which reflective operations are allowed on which types.
//!
//! | Flag     | Guards                                             |
//! |----------|----------------------------------------------------|
//! | `READ`   | field reads (`field_by_name`, `field`, ...)        |
//! | `WRITE`  | `set_field`, `set`, kind setters, `set_len`, `append` |
//! | `INVOKE` | `call`, `call_method`                              |
//! | `CREATE` | `new_instance`, `new_pointer`, `new_sequence`      |
//!
//! Resolution order: exact type name, then wildcard rules (first match in
//! the order they were added or written wins), then the global default.
//!
//! ## TOML Configuration
//!
//! ```toml
//! [reflect.permissions]
//! global = "ALL"
//!
//! [reflect.permissions.types]
//! "User" = "READ|INVOKE"
//! "Secret*" = "NONE"
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::config::{ConfigError, ReflectConfig};

/// Reflection permission flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReflectPermission(u8);

impl ReflectPermission {
    /// No reflection allowed
    pub const NONE: Self = Self(0x00);
    /// Read fields
    pub const READ: Self = Self(0x01);
    /// Write fields and sequence elements
    pub const WRITE: Self = Self(0x02);
    /// Invoke methods and functions
    pub const INVOKE: Self = Self(0x04);
    /// Create instances and sequences
    pub const CREATE: Self = Self(0x08);

    /// READ | WRITE
    pub const READ_WRITE: Self = Self(0x03);
    /// Everything
    pub const ALL: Self = Self(0x0F);

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if permission contains a flag
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of permissions
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Parse a single flag name, or a hex/decimal bit pattern
    pub fn parse_flag(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Some(Self::NONE),
            "READ" => Some(Self::READ),
            "WRITE" => Some(Self::WRITE),
            "INVOKE" => Some(Self::INVOKE),
            "CREATE" => Some(Self::CREATE),
            "READ_WRITE" => Some(Self::READ_WRITE),
            "ALL" => Some(Self::ALL),
            _ => {
                if let Some(hex) = s.strip_prefix("0x") {
                    u8::from_str_radix(hex, 16).ok().map(Self::from_bits)
                } else {
                    s.parse::<u8>().ok().map(Self::from_bits)
                }
            }
        }
    }

    /// Parse pipe-separated flags (e.g., "READ|INVOKE")
    pub fn parse(s: &str) -> Option<Self> {
        let mut result = Self::NONE;
        for part in s.split('|') {
            let perm = Self::parse_flag(part.trim())?;
            result = result.union(perm);
        }
        Some(result)
    }
}

impl Default for ReflectPermission {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for ReflectPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => return f.write_str("NONE"),
            Self::ALL => return f.write_str("ALL"),
            _ => {}
        }
        let names: Vec<&str> = [
            (Self::READ, "READ"),
            (Self::WRITE, "WRITE"),
            (Self::INVOKE, "INVOKE"),
            (Self::CREATE, "CREATE"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join("|"))
    }
}

/// Type-name pattern (supports a trailing `*` wildcard)
#[derive(Debug, Clone)]
pub struct TypePermissionRule {
    /// Pattern (e.g., "Secret*", "*")
    pub pattern: String,
    /// Permissions for matching types
    pub permissions: ReflectPermission,
}

impl TypePermissionRule {
    /// Check if a type name matches this pattern
    pub fn matches(&self, type_name: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => type_name.starts_with(prefix),
            None => self.pattern == type_name,
        }
    }
}

/// Store for reflection permissions
#[derive(Debug, Clone, Default)]
pub struct PermissionStore {
    /// Global default permissions
    global_default: ReflectPermission,

    /// Exact type-name entries
    type_permissions: FxHashMap<String, ReflectPermission>,

    /// Wildcard rules, in insertion order
    type_rules: Vec<TypePermissionRule>,
}

impl PermissionStore {
    /// Create a new permission store with default (ALL) permissions
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from the `[reflect.permissions]` configuration section
    pub fn from_config(config: &ReflectConfig) -> Result<Self, ConfigError> {
        let section = &config.reflect.permissions;
        let mut store = Self::new();

        if let Some(global) = &section.global {
            store.global_default = parse_entry("global", global)?;
        }
        for (pattern, value) in section.type_entries()? {
            let permissions = parse_entry(pattern, value)?;
            if pattern.contains('*') {
                store.add_rule(TypePermissionRule {
                    pattern: pattern.to_string(),
                    permissions,
                });
            } else {
                store.set_type(pattern, permissions);
            }
        }
        Ok(store)
    }

    /// Check if any permissions are configured (for fast-path optimization)
    pub fn has_any_restrictions(&self) -> bool {
        self.global_default != ReflectPermission::ALL
            || !self.type_permissions.is_empty()
            || !self.type_rules.is_empty()
    }

    /// Set global default permissions
    pub fn set_global(&mut self, permissions: ReflectPermission) {
        self.global_default = permissions;
    }

    /// Get global default permissions
    pub fn global(&self) -> ReflectPermission {
        self.global_default
    }

    /// Set permissions for one type name
    pub fn set_type(&mut self, type_name: &str, permissions: ReflectPermission) {
        self.type_permissions
            .insert(type_name.to_string(), permissions);
    }

    /// Get permissions for one type name (not resolved)
    pub fn get_type(&self, type_name: &str) -> Option<ReflectPermission> {
        self.type_permissions.get(type_name).copied()
    }

    /// Clear permissions for one type name
    pub fn clear_type(&mut self, type_name: &str) {
        self.type_permissions.remove(type_name);
    }

    /// Add a wildcard rule
    pub fn add_rule(&mut self, rule: TypePermissionRule) {
        self.type_rules.push(rule);
    }

    /// Resolve the effective permissions for a type name
    pub fn resolve(&self, type_name: &str) -> ReflectPermission {
        if let Some(perms) = self.get_type(type_name) {
            return perms;
        }
        self.type_rules
            .iter()
            .find(|rule| rule.matches(type_name))
            .map_or(self.global_default, |rule| rule.permissions)
    }

    /// Check if a specific permission is allowed
    pub fn check(&self, type_name: &str, required: ReflectPermission) -> bool {
        if !self.has_any_restrictions() {
            return true;
        }
        self.resolve(type_name).contains(required)
    }
}

fn parse_entry(key: &str, value: &str) -> Result<ReflectPermission, ConfigError> {
    ReflectPermission::parse(value).ok_or_else(|| ConfigError::InvalidPermission {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_flags() {
        let perm = ReflectPermission::READ.union(ReflectPermission::INVOKE);
        assert!(perm.contains(ReflectPermission::READ));
        assert!(perm.contains(ReflectPermission::INVOKE));
        assert!(!perm.contains(ReflectPermission::WRITE));
        assert_eq!(
            ReflectPermission::ALL.difference(ReflectPermission::WRITE),
            ReflectPermission::from_bits(0x0D)
        );
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(ReflectPermission::parse("ALL"), Some(ReflectPermission::ALL));
        assert_eq!(ReflectPermission::parse("none"), Some(ReflectPermission::NONE));
        assert_eq!(
            ReflectPermission::parse("READ | INVOKE"),
            Some(ReflectPermission::from_bits(0x05))
        );
        assert_eq!(ReflectPermission::parse("0x03"), Some(ReflectPermission::READ_WRITE));
        assert_eq!(ReflectPermission::parse("12"), Some(ReflectPermission::from_bits(12)));
        assert_eq!(ReflectPermission::parse("READ|BOGUS"), None);
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(ReflectPermission::NONE.to_string(), "NONE");
        assert_eq!(ReflectPermission::ALL.to_string(), "ALL");
        assert_eq!(ReflectPermission::WRITE.to_string(), "WRITE");
        assert_eq!(ReflectPermission::parse("READ|CREATE").unwrap().to_string(), "READ|CREATE");
    }

    #[test]
    fn test_rule_matching() {
        let rule = TypePermissionRule {
            pattern: "Secret*".to_string(),
            permissions: ReflectPermission::NONE,
        };
        assert!(rule.matches("SecretKey"));
        assert!(rule.matches("Secret"));
        assert!(!rule.matches("User"));

        let all = TypePermissionRule {
            pattern: "*".to_string(),
            permissions: ReflectPermission::READ,
        };
        assert!(all.matches("Anything"));
    }

    #[test]
    fn test_resolution_order() {
        let mut store = PermissionStore::new();
        assert!(!store.has_any_restrictions());
        assert!(store.check("User", ReflectPermission::WRITE));

        store.set_global(ReflectPermission::READ);
        store.add_rule(TypePermissionRule {
            pattern: "Us*".to_string(),
            permissions: ReflectPermission::READ_WRITE,
        });
        store.set_type("User", ReflectPermission::ALL);

        assert_eq!(store.resolve("User"), ReflectPermission::ALL);
        assert_eq!(store.resolve("UserList"), ReflectPermission::READ_WRITE);
        assert_eq!(store.resolve("Dog"), ReflectPermission::READ);
        assert!(!store.check("Dog", ReflectPermission::CREATE));

        store.clear_type("User");
        assert_eq!(store.resolve("User"), ReflectPermission::READ_WRITE);
    }
}
