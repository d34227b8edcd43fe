//! Registry of tool descriptors and dispatchers keyed by owning type.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use agent_primitives::TypeName;
use tracing::debug;

use crate::descriptor::ToolDescriptor;
use crate::dispatch::{Dispatcher, MethodMetadata};
use crate::error::{ToolError, ToolResult};
use crate::execution::ExecutionMode;

/// Published form of one tool.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    descriptor: ToolDescriptor,
    dispatcher: Dispatcher,
}

impl RegistryEntry {
    /// Pairs a descriptor with its dispatcher.
    #[must_use]
    pub const fn new(descriptor: ToolDescriptor, dispatcher: Dispatcher) -> Self {
        Self {
            descriptor,
            dispatcher,
        }
    }

    /// Returns the schema-level description.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Returns the runtime dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the marshalling metadata.
    #[must_use]
    pub fn metadata(&self) -> &MethodMetadata {
        self.dispatcher.metadata()
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.dispatcher.mode()
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Build-phase accumulator. Single-threaded; produces one [`ToolRegistry`].
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    owners: BTreeMap<TypeName, Vec<RegistryEntry>>,
    names: HashMap<String, TypeName>,
}

impl ToolRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its owning type.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateToolName`] if another entry already uses
    /// the tool name; the earlier entry is kept.
    pub fn register(&mut self, owner: TypeName, entry: RegistryEntry) -> ToolResult<()> {
        if let Some(existing_owner) = self.names.get(entry.name()) {
            return Err(ToolError::DuplicateToolName {
                name: entry.name().to_owned(),
                owner,
                existing_owner: existing_owner.clone(),
            });
        }

        self.names.insert(entry.name().to_owned(), owner.clone());
        self.owners.entry(owner).or_default().push(entry);
        Ok(())
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Freezes the accumulated entries into an immutable snapshot.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        ToolRegistry::from_owners(self.owners)
    }
}

struct Snapshot {
    owners: BTreeMap<TypeName, Vec<RegistryEntry>>,
    by_name: HashMap<String, (TypeName, usize)>,
}

/// Immutable tool registry shared across request handlers.
///
/// Cloning is cheap; every clone refers to the same snapshot.
#[derive(Clone)]
pub struct ToolRegistry {
    inner: Arc<Snapshot>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::from_owners(BTreeMap::new())
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: BTreeMap<_, Vec<_>> = self
            .inner
            .owners
            .iter()
            .map(|(owner, entries)| {
                (owner.as_str(), entries.iter().map(RegistryEntry::name).collect())
            })
            .collect();
        f.debug_struct("ToolRegistry").field("tools", &tools).finish()
    }
}

impl ToolRegistry {
    /// Starts a build phase.
    #[must_use]
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    fn from_owners(owners: BTreeMap<TypeName, Vec<RegistryEntry>>) -> Self {
        let by_name = owners
            .iter()
            .flat_map(|(owner, entries)| {
                entries
                    .iter()
                    .enumerate()
                    .map(move |(index, entry)| (entry.name().to_owned(), (owner.clone(), index)))
            })
            .collect();
        Self {
            inner: Arc::new(Snapshot { owners, by_name }),
        }
    }

    /// Returns the entries declared by `owner`, or an empty slice.
    #[must_use]
    pub fn lookup(&self, owner: &str) -> &[RegistryEntry] {
        self.inner.owners.get(owner).map_or(&[], Vec::as_slice)
    }

    /// Finds a tool by name, returning its owner and entry.
    #[must_use]
    pub fn find(&self, tool: &str) -> Option<(&TypeName, &RegistryEntry)> {
        let (owner, index) = self.inner.by_name.get(tool)?;
        let entry = self.inner.owners.get(owner)?.get(*index)?;
        Some((owner, entry))
    }

    /// Returns a view restricted to the supplied owners.
    #[must_use]
    pub fn filter(&self, active: &HashSet<TypeName>) -> Self {
        self.retain(|owner| active.contains(owner))
    }

    /// Returns a view without the owners the host pruned.
    #[must_use]
    pub fn without_removed(&self, removed: &HashSet<TypeName>) -> Self {
        self.retain(|owner| !removed.contains(owner))
    }

    fn retain(&self, keep: impl Fn(&TypeName) -> bool) -> Self {
        let owners: BTreeMap<_, _> = self
            .inner
            .owners
            .iter()
            .filter(|(owner, _)| keep(owner))
            .map(|(owner, entries)| (owner.clone(), entries.clone()))
            .collect();

        debug!(
            before = ?self.inner.owners.keys().collect::<Vec<_>>(),
            after = ?owners.keys().collect::<Vec<_>>(),
            "filtered tool owners"
        );
        Self::from_owners(owners)
    }

    /// Iterates over owners in name order.
    pub fn owners(&self) -> impl Iterator<Item = &TypeName> {
        self.inner.owners.keys()
    }

    /// Iterates over all entries, grouped by owner.
    pub fn entries(&self) -> impl Iterator<Item = (&TypeName, &RegistryEntry)> {
        self.inner
            .owners
            .iter()
            .flat_map(|(owner, entries)| entries.iter().map(move |entry| (owner, entry)))
    }

    /// Returns every published descriptor.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.entries().map(|(_, entry)| entry.descriptor()).collect()
    }

    /// Number of published tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.by_name.len()
    }

    /// Returns `true` when no tool is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::dispatch::{ToolOutput, build_dispatcher, tool_target};

    fn type_name(name: &str) -> TypeName {
        TypeName::new(name).unwrap()
    }

    fn entry(tool: &str, answer: Value) -> RegistryEntry {
        let descriptor = ToolDescriptor::builder(tool).build().unwrap();
        let target = tool_target(move |_, _| Ok(ToolOutput::ready(answer.clone())));
        let dispatcher =
            build_dispatcher(MethodMetadata::default(), Arc::new(target)).with_tool_name(tool);
        RegistryEntry::new(descriptor, dispatcher)
    }

    #[test]
    fn duplicate_name_keeps_first_registration() {
        let mut builder = ToolRegistry::builder();
        builder
            .register(type_name("web::Google"), entry("search", json!("google")))
            .unwrap();

        let err = builder
            .register(type_name("web::Bing"), entry("search", json!("bing")))
            .expect_err("duplicate registration should fail");
        assert!(matches!(
            err,
            ToolError::DuplicateToolName { ref name, ref existing_owner, .. }
                if name == "search" && existing_owner.as_str() == "web::Google"
        ));

        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("web::Bing").is_empty());

        let (owner, found) = registry.find("search").unwrap();
        assert_eq!(owner.as_str(), "web::Google");
        let output = found.dispatcher().invoke(Arc::new(()), Vec::new()).unwrap();
        assert_eq!(output.into_ready(), Some(json!("google")));
    }

    #[test]
    fn lookup_returns_entries_per_owner() {
        let mut builder = ToolRegistry::builder();
        builder.register(type_name("calc::Calc"), entry("add", Value::Null)).unwrap();
        builder.register(type_name("calc::Calc"), entry("sub", Value::Null)).unwrap();
        builder.register(type_name("clock::Clock"), entry("now", Value::Null)).unwrap();
        let registry = builder.build();

        let names: Vec<_> = registry.lookup("calc::Calc").iter().map(RegistryEntry::name).collect();
        assert_eq!(names, vec!["add", "sub"]);
        assert!(registry.lookup("missing::Type").is_empty());
        assert_eq!(registry.descriptors().len(), 3);
    }

    #[test]
    fn filter_and_removal_produce_subsets() {
        let mut builder = ToolRegistry::builder();
        builder.register(type_name("a::Kept"), entry("kept", Value::Null)).unwrap();
        builder.register(type_name("a::Pruned"), entry("pruned", Value::Null)).unwrap();
        let registry = builder.build();

        let active: HashSet<_> = [type_name("a::Kept")].into_iter().collect();
        let view = registry.filter(&active);
        assert_eq!(view.owners().collect::<Vec<_>>(), vec![&type_name("a::Kept")]);
        assert!(view.find("pruned").is_none());

        let removed: HashSet<_> = [type_name("a::Pruned")].into_iter().collect();
        let view = registry.without_removed(&removed);
        assert!(view.find("kept").is_some());
        assert!(view.find("pruned").is_none());

        // The original snapshot is untouched.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn debug_lists_tools() {
        let mut builder = ToolRegistry::builder();
        builder.register(type_name("calc::Calc"), entry("add", Value::Null)).unwrap();
        let rendered = format!("{:?}", builder.build());
        assert!(rendered.contains("calc::Calc"));
        assert!(rendered.contains("add"));
    }
}
