//! Typed, immutable selections of model entities and the rules attached to them.
//!
//! A selection that failed to resolve (an unknown interface, a bad pattern)
//! carries its error. Chained selections inherit it without doing any work and
//! every rule built from the selection reports exactly that error.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::architecture::{Architecture, ConfigError, Layer};
use crate::matcher::{matches_all, Matcher};
use crate::model::{Entity, File, Function, LookupError, Package, Type, Variable};
use crate::pattern::{self, PackagePattern, PatternError};
use crate::rule::{Rule, RuleError, Violations};
use crate::types::Category;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("type '{0}' is not an interface")]
    NotAnInterface(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct Selection<'a, T> {
    arch: &'a Architecture,
    items: Vec<&'a T>,
    error: Option<SelectionError>,
}

impl<T> Clone for Selection<'_, T> {
    fn clone(&self) -> Self {
        Self {
            arch: self.arch,
            items: self.items.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T: Entity + 'static> std::fmt::Debug for Selection<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("items", &self.names())
            .field("error", &self.error)
            .finish()
    }
}

impl<'a, T: Entity + 'static> Selection<'a, T> {
    pub fn new(arch: &'a Architecture, items: Vec<&'a T>) -> Self {
        Self {
            arch,
            items,
            error: None,
        }
    }

    pub fn failed(arch: &'a Architecture, error: SelectionError) -> Self {
        Self {
            arch,
            items: Vec::new(),
            error: Some(error),
        }
    }

    fn from_filtered(
        arch: &'a Architecture,
        items: impl IntoIterator<Item = &'a T>,
        matchers: &[Matcher<T>],
    ) -> Self {
        let items = items
            .into_iter()
            .filter(|item| matches_all(matchers, item))
            .collect();
        Self::new(arch, items)
    }

    /// A selection of another kind sharing this selection's error, if any.
    fn derive<U: Entity + 'static>(
        &self,
        build: impl FnOnce(&[&'a T]) -> Selection<'a, U>,
    ) -> Selection<'a, U> {
        match &self.error {
            Some(e) => Selection::failed(self.arch, e.clone()),
            None => build(&self.items),
        }
    }

    pub fn error(&self) -> Option<&SelectionError> {
        self.error.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.items.iter().copied()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.items.iter().map(|i| i.name()).collect()
    }

    /// Further filter the selection.
    pub fn that(self, matchers: &[Matcher<T>]) -> Self {
        if self.error.is_some() {
            return self;
        }
        let arch = self.arch;
        Self::from_filtered(arch, self.items, matchers)
    }

    /// Every item's name must satisfy the matcher.
    pub fn name_should(self, matcher: Matcher<T>) -> Rule<'a> {
        self.naming_rule(matcher, true)
    }

    /// No item's name may satisfy the matcher.
    pub fn name_should_not(self, matcher: Matcher<T>) -> Rule<'a> {
        self.naming_rule(matcher, false)
    }

    fn naming_rule(self, matcher: Matcher<T>, expected: bool) -> Rule<'a> {
        let verb = if expected { "should" } else { "should not" };
        let description = format!("name {verb} {}", matcher.description());
        self.should(description, T::CATEGORY, move |item: &T| {
            let (hit, description) = matcher.evaluate(item);
            (hit != expected).then(|| format!("name {} {verb} {description}", item.name()))
        })
    }

    /// Attach a custom per-item check. `check` returns a message for each offending item.
    pub fn should(
        self,
        description: impl Into<String>,
        category: Category,
        check: impl Fn(&T) -> Option<String> + Send + Sync + 'a,
    ) -> Rule<'a> {
        Rule::new(description, move |_: &Architecture| {
            if let Some(e) = &self.error {
                return Err(RuleError::Selection(e.clone()));
            }
            let messages = self.items.iter().filter_map(|item| check(*item)).collect();
            Violations::new(category, messages).into_result()
        })
    }
}

/// Entities with an import footprint.
pub trait Referable: Entity + 'static {
    /// Package IDs the item stands for.
    fn package_footprint<'a>(&'a self, arch: &'a Architecture) -> Vec<&'a str>;
}

impl Referable for Layer {
    fn package_footprint<'a>(&'a self, _arch: &'a Architecture) -> Vec<&'a str> {
        Layer::footprint(self).iter().map(String::as_str).collect()
    }
}

impl Referable for Package {
    fn package_footprint<'a>(&'a self, _arch: &'a Architecture) -> Vec<&'a str> {
        vec![self.id()]
    }
}

impl Referable for Type {
    fn package_footprint<'a>(&'a self, _arch: &'a Architecture) -> Vec<&'a str> {
        vec![self.package_path()]
    }
}

/// Direct imports over a footprint, sorted and deduplicated.
fn dependencies<'a>(arch: &'a Architecture, footprint: &[&str]) -> BTreeSet<&'a str> {
    footprint
        .iter()
        .filter_map(|id| arch.artifact().package(id))
        .flat_map(|p| p.imports().iter().map(String::as_str))
        .collect()
}

fn union_footprint<'a, U: Referable>(
    arch: &'a Architecture,
    items: &[&'a U],
) -> HashSet<&'a str> {
    items.iter().flat_map(|i| i.package_footprint(arch)).collect()
}

fn refer_violation(from: &str, to: &str) -> String {
    format!("arch violation: <{from}> is not allowed to refer to <{to}>")
}

/// Overlapping items report the same edge once, in discovery order.
fn reference_violations<T: Referable>(messages: Vec<String>) -> Result<(), RuleError> {
    let mut seen = HashSet::new();
    let messages = messages
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect();
    Violations::new(T::CATEGORY, messages).into_result()
}

fn first_error(errors: [Option<&SelectionError>; 2]) -> Result<(), RuleError> {
    match errors.into_iter().flatten().next() {
        Some(e) => Err(RuleError::Selection(e.clone())),
        None => Ok(()),
    }
}

impl<'a, T: Referable> Selection<'a, T> {
    /// No item may import a package of `forbidden` outside its own footprint.
    pub fn should_not_refer<U: Referable>(self, forbidden: Selection<'a, U>) -> Rule<'a> {
        let description = format!("should not refer to {:?}", forbidden.names());
        Rule::new(description, move |arch: &Architecture| {
            first_error([self.error(), forbidden.error()])?;
            let targets = union_footprint(arch, &forbidden.items);
            let mut messages = Vec::new();
            for item in &self.items {
                let own: HashSet<&str> = item.package_footprint(arch).into_iter().collect();
                let own_list: Vec<&str> = own.iter().copied().collect();
                for dep in dependencies(arch, &own_list) {
                    if targets.contains(dep) && !own.contains(dep) {
                        messages.push(refer_violation(&item.describe(), dep));
                    }
                }
            }
            reference_violations::<T>(messages)
        })
    }

    /// Items may only import packages of `allowed`, their own footprint, or the
    /// standard library.
    pub fn should_only_refer<U: Referable>(self, allowed: Selection<'a, U>) -> Rule<'a> {
        let description = format!("should only refer to {:?}", allowed.names());
        Rule::new(description, move |arch: &Architecture| {
            first_error([self.error(), allowed.error()])?;
            let targets = union_footprint(arch, &allowed.items);
            let mut messages = Vec::new();
            for item in &self.items {
                let own_list = item.package_footprint(arch);
                let own: HashSet<&str> = own_list.iter().copied().collect();
                for dep in dependencies(arch, &own_list) {
                    if !targets.contains(dep)
                        && !own.contains(dep)
                        && !pattern::is_standard_library(dep)
                    {
                        messages.push(refer_violation(&item.describe(), dep));
                    }
                }
            }
            reference_violations::<T>(messages)
        })
    }

    /// No item of `referrers` may import a package of an item's footprint.
    pub fn should_not_be_referred_by<U: Referable>(self, referrers: Selection<'a, U>) -> Rule<'a> {
        let description = format!("should not be referred by {:?}", referrers.names());
        Rule::new(description, move |arch: &Architecture| {
            first_error([self.error(), referrers.error()])?;
            let mut messages = Vec::new();
            for item in &self.items {
                let own: HashSet<&str> = item.package_footprint(arch).into_iter().collect();
                for referrer in &referrers.items {
                    let referrer_footprint = referrer.package_footprint(arch);
                    for dep in dependencies(arch, &referrer_footprint) {
                        if own.contains(dep) && !referrer_footprint.contains(&dep) {
                            messages.push(refer_violation(&referrer.describe(), dep));
                        }
                    }
                }
            }
            reference_violations::<T>(messages)
        })
    }

    /// Only packages of `allowed` (or of the item itself) may import an item's footprint.
    pub fn should_only_be_referred_by<U: Referable>(self, allowed: Selection<'a, U>) -> Rule<'a> {
        let description = format!("should only be referred by {:?}", allowed.names());
        Rule::new(description, move |arch: &Architecture| {
            first_error([self.error(), allowed.error()])?;
            let permitted = union_footprint(arch, &allowed.items);
            let mut messages = Vec::new();
            for item in &self.items {
                let own: HashSet<&str> = item.package_footprint(arch).into_iter().collect();
                for package in arch.artifact().packages(false) {
                    if permitted.contains(package.id()) || own.contains(package.id()) {
                        continue;
                    }
                    for dep in package.imports() {
                        if own.contains(dep.as_str()) {
                            messages.push(refer_violation(package.id(), dep));
                        }
                    }
                }
            }
            reference_violations::<T>(messages)
        })
    }
}

/// Entities with an exported/unexported distinction.
pub trait Exportable: Entity + 'static {
    fn exported(&self) -> bool {
        pattern::is_exported(self.name())
    }
}

impl Exportable for Type {}
impl Exportable for Function {}
impl Exportable for Variable {}

impl<'a, T: Exportable> Selection<'a, T> {
    pub fn should_be_exported(self) -> Rule<'a> {
        self.should("should be exported", T::CATEGORY, |item: &T| {
            (!item.exported()).then(|| format!("{} should be exported", item.describe()))
        })
    }

    pub fn should_not_be_exported(self) -> Rule<'a> {
        self.should("should not be exported", T::CATEGORY, |item: &T| {
            item.exported()
                .then(|| format!("{} should not be exported", item.describe()))
        })
    }

    /// The item's package path must match the glob.
    pub fn should_reside_in_packages(self, glob: &str) -> Rule<'a> {
        let description = format!("should reside in packages \"{glob}\"");
        match pattern::package_glob(glob) {
            Ok(matcher) => {
                let glob = glob.to_string();
                self.should(description, Category::Location, move |item: &T| {
                    (!matcher.is_match(item.package_id())).then(|| {
                        format!("{} should reside in packages \"{glob}\"", item.describe())
                    })
                })
            }
            Err(e) => Rule::new(description, move |_: &Architecture| {
                first_error([self.error(), None])?;
                Err(RuleError::Selection(e.clone().into()))
            }),
        }
    }

    /// The item's package must belong to one of the layers.
    pub fn should_reside_in_layers(self, layers: Selection<'a, Layer>) -> Rule<'a> {
        let names = layers.names();
        let description = format!("should reside in layers {names:?}");
        Rule::new(description, move |arch: &Architecture| {
            first_error([self.error(), layers.error()])?;
            let footprint = union_footprint(arch, &layers.items);
            let messages = self
                .items
                .iter()
                .filter(|item| !footprint.contains(item.package_id()))
                .map(|item| {
                    format!(
                        "{} should reside in layers [{}]",
                        item.describe(),
                        names.join(", ")
                    )
                })
                .collect();
            Violations::new(Category::Location, messages).into_result()
        })
    }
}

impl<'a> Selection<'a, Layer> {
    /// Application packages belonging to any selected layer.
    pub fn packages(&self, matchers: &[Matcher<Package>]) -> Selection<'a, Package> {
        let arch = self.arch;
        self.derive(|layers| {
            let ids: BTreeSet<&str> = layers
                .iter()
                .flat_map(|l| l.footprint().iter().map(String::as_str))
                .collect();
            let packages = ids
                .into_iter()
                .filter_map(|id| arch.artifact().package(id))
                .filter(|p| p.is_application());
            Selection::from_filtered(arch, packages, matchers)
        })
    }
}

impl<'a> Selection<'a, Package> {
    pub fn types(&self, matchers: &[Matcher<Type>]) -> Selection<'a, Type> {
        let arch = self.arch;
        self.derive(|packages| {
            Selection::from_filtered(arch, packages.iter().flat_map(|p| p.types()), matchers)
        })
    }

    pub fn functions(&self, matchers: &[Matcher<Function>]) -> Selection<'a, Function> {
        let arch = self.arch;
        self.derive(|packages| {
            Selection::from_filtered(arch, packages.iter().flat_map(|p| p.functions()), matchers)
        })
    }

    pub fn variables(&self, matchers: &[Matcher<Variable>]) -> Selection<'a, Variable> {
        let arch = self.arch;
        self.derive(|packages| {
            Selection::from_filtered(arch, packages.iter().flat_map(|p| p.variables()), matchers)
        })
    }

    pub fn files(&self, matchers: &[Matcher<File>]) -> Selection<'a, File> {
        let arch = self.arch;
        self.derive(|packages| {
            Selection::from_filtered(arch, packages.iter().flat_map(|p| p.files()), matchers)
        })
    }
}

impl<'a> Selection<'a, Type> {
    pub fn methods(&self, matchers: &[Matcher<Function>]) -> Selection<'a, Function> {
        let arch = self.arch;
        self.derive(|types| {
            Selection::from_filtered(arch, types.iter().flat_map(|t| t.methods()), matchers)
        })
    }
}

impl Architecture {
    /// Select declared layers by name; all layers when `names` is empty.
    ///
    /// # Panics
    ///
    /// Panics when a name is not a declared layer. Use [`Architecture::try_layers`]
    /// to handle that case.
    pub fn layers(&self, names: &[&str]) -> Selection<'_, Layer> {
        match self.try_layers(names) {
            Ok(selection) => selection,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_layers(&self, names: &[&str]) -> Result<Selection<'_, Layer>, ConfigError> {
        if names.is_empty() {
            return Ok(Selection::new(self, self.declared_layers().iter().collect()));
        }
        let layers = names
            .iter()
            .map(|name| {
                self.layer(name)
                    .ok_or_else(|| ConfigError::UnknownLayer(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selection::new(self, layers))
    }

    /// Application packages satisfying every matcher.
    pub fn packages(&self, matchers: &[Matcher<Package>]) -> Selection<'_, Package> {
        Selection::from_filtered(self, self.artifact().packages(true), matchers)
    }

    /// Application packages whose path matches a `...` package pattern.
    pub fn packages_matching(&self, pattern: &str) -> Selection<'_, Package> {
        match PackagePattern::compile(pattern) {
            Ok(pattern) => Selection::new(
                self,
                self.artifact()
                    .packages(true)
                    .into_iter()
                    .filter(|p| pattern.is_match(p.id()))
                    .collect(),
            ),
            Err(e) => Selection::failed(self, e.into()),
        }
    }

    pub fn types(&self, matchers: &[Matcher<Type>]) -> Selection<'_, Type> {
        Selection::from_filtered(self, self.artifact().types(), matchers)
    }

    /// Loaded non-interface types other than the interface itself that satisfy it.
    pub fn types_implementing(&self, interface: &str) -> Selection<'_, Type> {
        let iface = match self.artifact().type_named(interface) {
            Ok(t) => t,
            Err(e) => return Selection::failed(self, e.into()),
        };
        if !iface.is_interface() {
            return Selection::failed(
                self,
                SelectionError::NotAnInterface(iface.qualified_name()),
            );
        }
        let artifact = self.artifact();
        let items = artifact
            .packages(false)
            .into_iter()
            .flat_map(|p| p.types())
            .filter(|t| !t.is_interface() && !std::ptr::eq(*t, iface))
            .filter(|t| artifact.implements(t, iface))
            .collect();
        Selection::new(self, items)
    }

    /// Package-level functions of application packages.
    pub fn functions(&self, matchers: &[Matcher<Function>]) -> Selection<'_, Function> {
        Selection::from_filtered(self, self.artifact().functions(), matchers)
    }

    /// Methods of the application types satisfying every matcher.
    pub fn methods_of(&self, type_matchers: &[Matcher<Type>]) -> Selection<'_, Function> {
        self.types(type_matchers).methods(&[])
    }

    /// Package-level variables whose resolved type renders as `type_string`.
    pub fn variables_of_type(&self, type_string: &str) -> Selection<'_, Variable> {
        let artifact = self.artifact();
        let items = artifact
            .variables()
            .into_iter()
            .filter(|v| artifact.resolve(v.inferred_type()).to_string() == type_string)
            .collect();
        Selection::new(self, items)
    }

    pub fn source_files(&self, matchers: &[Matcher<File>]) -> Selection<'_, File> {
        let files = self.artifact().files().into_iter().filter(|f| !f.is_test());
        Selection::from_filtered(self, files, matchers)
    }

    pub fn test_files(&self, matchers: &[Matcher<File>]) -> Selection<'_, File> {
        let files = self.artifact().files().into_iter().filter(|f| f.is_test());
        Selection::from_filtered(self, files, matchers)
    }
}
