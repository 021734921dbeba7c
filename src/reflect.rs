use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::inventory::Inventory;

/// Reflective capability requested for a class. Declaration order is the field order
/// used when serializing an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessFlag {
    AllDeclaredConstructors,
    AllDeclaredMethods,
    AllDeclaredFields,
    AllPublicConstructors,
    AllPublicMethods,
    AllPublicFields,
    UnsafeAllocated,
}

impl AccessFlag {
    pub const ALL: [AccessFlag; 7] = [
        AccessFlag::AllDeclaredConstructors,
        AccessFlag::AllDeclaredMethods,
        AccessFlag::AllDeclaredFields,
        AccessFlag::AllPublicConstructors,
        AccessFlag::AllPublicMethods,
        AccessFlag::AllPublicFields,
        AccessFlag::UnsafeAllocated,
    ];

    /// Reduced set granted to package patterns.
    pub const PATTERN: [AccessFlag; 4] = [
        AccessFlag::AllDeclaredConstructors,
        AccessFlag::AllDeclaredMethods,
        AccessFlag::AllDeclaredFields,
        AccessFlag::UnsafeAllocated,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AccessFlag::AllDeclaredConstructors => "allDeclaredConstructors",
            AccessFlag::AllDeclaredMethods => "allDeclaredMethods",
            AccessFlag::AllDeclaredFields => "allDeclaredFields",
            AccessFlag::AllPublicConstructors => "allPublicConstructors",
            AccessFlag::AllPublicMethods => "allPublicMethods",
            AccessFlag::AllPublicFields => "allPublicFields",
            AccessFlag::UnsafeAllocated => "unsafeAllocated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Class,
    Pattern,
}

/// One record of `reflect-config.json`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflectionEntry {
    pub name: String,
    pub kind: EntryKind,
    pub access: BTreeSet<AccessFlag>,
}

impl ReflectionEntry {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Class,
            access: AccessFlag::ALL.into_iter().collect(),
        }
    }

    pub fn pattern(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Pattern,
            access: AccessFlag::PATTERN.into_iter().collect(),
        }
    }
}

impl Serialize for ReflectionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.access.len() + 1))?;
        map.serialize_entry("name", &self.name)?;
        for flag in &self.access {
            map.serialize_entry(flag.key(), &true)?;
        }
        map.end()
    }
}

/// One inclusion rule of `resource-config.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceRule {
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct ResourceConfig {
    pub resources: ResourceIncludes,
}

#[derive(Debug, Serialize)]
pub struct ResourceIncludes {
    pub includes: Vec<ResourceRule>,
}

/// Exact classes first, then patterns, each in inventory order. A name already
/// emitted is skipped so every record in the artifact is unique.
pub fn build_reflection_entries(inventory: &Inventory) -> Vec<ReflectionEntry> {
    let mut seen = HashSet::new();
    let classes = inventory
        .classes
        .iter()
        .map(|name| ReflectionEntry::class(name.as_str()));
    let patterns = inventory
        .patterns
        .iter()
        .map(|name| ReflectionEntry::pattern(name.as_str()));

    classes
        .chain(patterns)
        .filter(|entry| {
            let fresh = seen.insert(entry.name.clone());
            if !fresh {
                tracing::warn!(name = %entry.name, "dropping duplicate reflection entry");
            }
            fresh
        })
        .collect()
}

pub fn build_resource_rules(inventory: &Inventory) -> ResourceConfig {
    let mut seen = HashSet::new();
    let includes = inventory
        .resources
        .iter()
        .filter(|pattern| seen.insert(pattern.as_str()))
        .map(|pattern| ResourceRule {
            pattern: pattern.clone(),
        })
        .collect();
    ResourceConfig {
        resources: ResourceIncludes { includes },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn inventory(classes: &[&str], patterns: &[&str]) -> Inventory {
        Inventory {
            classes: classes.iter().map(|s| s.to_string()).collect(),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            resources: Vec::new(),
        }
    }

    #[test]
    fn single_class_and_pattern_render_in_order() {
        let entries = build_reflection_entries(&inventory(&["pkg.Foo"], &["pkg.**"]));
        let rendered = serde_json::to_value(&entries).unwrap();
        assert_eq!(
            rendered,
            json!([
                {
                    "name": "pkg.Foo",
                    "allDeclaredConstructors": true,
                    "allDeclaredMethods": true,
                    "allDeclaredFields": true,
                    "allPublicConstructors": true,
                    "allPublicMethods": true,
                    "allPublicFields": true,
                    "unsafeAllocated": true
                },
                {
                    "name": "pkg.**",
                    "allDeclaredConstructors": true,
                    "allDeclaredMethods": true,
                    "allDeclaredFields": true,
                    "unsafeAllocated": true
                }
            ])
        );
    }

    #[test]
    fn fields_keep_insertion_order() {
        let text = serde_json::to_string(&ReflectionEntry::pattern("pkg.**")).unwrap();
        assert_eq!(
            text,
            r#"{"name":"pkg.**","allDeclaredConstructors":true,"allDeclaredMethods":true,"allDeclaredFields":true,"unsafeAllocated":true}"#
        );
    }

    #[test]
    fn every_default_class_gets_full_access_once() {
        let inventory = Inventory::default();
        let entries = build_reflection_entries(&inventory);
        for class in &inventory.classes {
            let matching = entries
                .iter()
                .filter(|entry| &entry.name == class)
                .collect::<Vec<_>>();
            assert_eq!(matching.len(), 1, "{class}");
            assert_eq!(matching[0].access.len(), 7);
        }
        for pattern in &inventory.patterns {
            let matching = entries
                .iter()
                .filter(|entry| &entry.name == pattern)
                .collect::<Vec<_>>();
            assert_eq!(matching.len(), 1, "{pattern}");
            assert_eq!(
                matching[0].access,
                AccessFlag::PATTERN.into_iter().collect::<BTreeSet<_>>()
            );
        }
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let entries = build_reflection_entries(&inventory(
            &["pkg.Foo", "pkg.Bar", "pkg.Foo"],
            &["pkg.Bar", "pkg.**"],
        ));
        let names = entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["pkg.Foo", "pkg.Bar", "pkg.**"]);
        assert_eq!(entries[1].kind, EntryKind::Class);
    }

    #[test]
    fn resource_config_shape() {
        let config = build_resource_rules(&Inventory::default());
        let rendered = serde_json::to_value(&config).unwrap();
        let includes = rendered["resources"]["includes"].as_array().unwrap();
        assert_eq!(includes.len(), 6);
        assert_eq!(includes[0], json!({ "pattern": ".*\\.properties$" }));
        assert_eq!(includes[5]["pattern"], Value::from(".*\\.dat$"));
    }
}
