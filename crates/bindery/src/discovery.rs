//! Method discovery
//!
//! Walks an instance's chain level by level: the instance's own properties,
//! then its class, then each ancestor, stopping before the root sentinel.
//! Within a level string-named members come first in declaration order,
//! followed by symbol-keyed members in declaration order. A derived level's
//! name shadows the same name further up, so each name is reported once, at
//! the position of its most-derived declaration.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::class::{Class, MemberKey, Visibility, CONSTRUCTOR};
use crate::config::DiscoveryConfig;
use crate::instance::Instance;

/// One enumerated entry of a level, before filtering
struct Entry {
    key: MemberKey,
    name: String,
    callable: bool,
    visibility: Visibility,
}

/// A discovered method: its reported name, the key it was declared under
/// and the class level it came from (`None` for the instance's own properties)
pub(crate) struct Discovered {
    pub(crate) name: String,
    pub(crate) key: MemberKey,
    pub(crate) origin: Option<Arc<Class>>,
}

/// Public method names of `instance`, most-derived first
pub fn discover_public_methods(instance: &Instance) -> Vec<String> {
    discover_public_methods_with(instance, &DiscoveryConfig::default())
}

/// Public method names of `instance` under a custom config
pub fn discover_public_methods_with(instance: &Instance, config: &DiscoveryConfig) -> Vec<String> {
    discover(instance, config)
        .into_iter()
        .map(|found| found.name)
        .collect()
}

pub(crate) fn discover(instance: &Instance, config: &DiscoveryConfig) -> Vec<Discovered> {
    let mut discovered = Vec::new();
    let mut seen = FxHashSet::default();

    let own = instance.own_properties();
    let own_entries = enumerate(
        own.iter()
            .map(|(key, value)| (key, value.is_callable(), Visibility::Public)),
        config,
    );
    collect_level(None, own_entries, config, &mut seen, &mut discovered);

    for class in instance.class().ancestors().take_while(|class| !class.is_root()) {
        let entries = enumerate(
            class
                .members()
                .iter()
                .map(|(key, member)| (key, member.is_method(), member.visibility)),
            config,
        );
        collect_level(Some(&class), entries, config, &mut seen, &mut discovered);
    }

    discovered
}

fn enumerate<'a>(
    members: impl Iterator<Item = (&'a MemberKey, bool, Visibility)>,
    config: &DiscoveryConfig,
) -> Vec<Entry> {
    let (names, symbols): (Vec<_>, Vec<_>) = members.partition(|(key, _, _)| !key.is_symbol());
    let symbols = symbols.into_iter().filter(|_| config.include_symbols);
    names
        .into_iter()
        .chain(symbols)
        .map(|(key, callable, visibility)| Entry {
            key: key.clone(),
            name: key.to_string(),
            callable,
            visibility,
        })
        .collect()
}

fn collect_level(
    origin: Option<&Arc<Class>>,
    entries: Vec<Entry>,
    config: &DiscoveryConfig,
    seen: &mut FxHashSet<String>,
    discovered: &mut Vec<Discovered>,
) {
    let before = discovered.len();
    for (index, entry) in entries.iter().enumerate() {
        let repeats_previous = index > 0 && entries[index - 1].name == entry.name;
        if !entry.callable
            || entry.name == CONSTRUCTOR
            || repeats_previous
            || seen.contains(&entry.name)
            || config.is_private(&entry.name, entry.visibility)
        {
            continue;
        }
        seen.insert(entry.name.clone());
        discovered.push(Discovered {
            name: entry.name.clone(),
            key: entry.key.clone(),
            origin: origin.cloned(),
        });
    }
    trace!(
        level = origin.map_or("<instance>", |class| class.name()),
        enumerated = entries.len(),
        accepted = discovered.len() - before,
        "discovery level"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::instance::CallContext;
    use crate::value::{Symbol, Value};

    fn unit(_: &CallContext<'_>, _: &[Value]) -> Result<Value> {
        Ok(Value::Null)
    }

    #[test]
    fn test_empty_class() {
        let instance = Class::builder("Empty").build().construct(&[]).unwrap();
        assert!(discover_public_methods(&instance).is_empty());
    }

    #[test]
    fn test_excludes_root_builtins() {
        let instance = Class::builder("Plain")
            .method("run", unit)
            .build()
            .construct(&[])
            .unwrap();
        assert_eq!(discover_public_methods(&instance), vec!["run"]);
    }

    #[test]
    fn test_explicit_constructor_name_excluded() {
        let instance = Class::builder("Odd")
            .method(CONSTRUCTOR, unit)
            .method("other", unit)
            .build()
            .construct(&[])
            .unwrap();
        assert_eq!(discover_public_methods(&instance), vec!["other"]);
    }

    #[test]
    fn test_names_before_symbols() {
        let symbol = Symbol::new("inspect");
        let instance = Class::builder("Mixed")
            .method(&symbol, unit)
            .method("b", unit)
            .method("a", unit)
            .build()
            .construct(&[])
            .unwrap();
        assert_eq!(
            discover_public_methods(&instance),
            vec!["b", "a", "Symbol(inspect)"]
        );

        let config = DiscoveryConfig::default().with_symbols(false);
        assert_eq!(discover_public_methods_with(&instance, &config), vec!["b", "a"]);
    }

    #[test]
    fn test_stringified_symbol_collision_reported_once() {
        let instance = Class::builder("Collide")
            .method("Symbol(tag)", unit)
            .method(Symbol::new("tag"), unit)
            .build()
            .construct(&[])
            .unwrap();
        assert_eq!(discover_public_methods(&instance), vec!["Symbol(tag)"]);
    }

    #[test]
    fn test_own_function_properties_first() {
        let class = Class::builder("WithOwn")
            .constructor(|ctx, _| {
                ctx.set("handler", Value::function("handler", |_| Ok(Value::Null)))?;
                ctx.set("count", 0i64)
            })
            .method("method", unit)
            .build();
        let instance = class.construct(&[]).unwrap();
        assert_eq!(discover_public_methods(&instance), vec!["handler", "method"]);
    }

    #[test]
    fn test_custom_prefix() {
        let instance = Class::builder("Prefixed")
            .method("_internal", unit)
            .method("$hidden", unit)
            .build()
            .construct(&[])
            .unwrap();
        assert_eq!(discover_public_methods(&instance), vec!["$hidden"]);

        let config = DiscoveryConfig::default().with_private_prefix("$").unwrap();
        assert_eq!(discover_public_methods_with(&instance, &config), vec!["_internal"]);
    }
}
