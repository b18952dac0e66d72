//! Transitive dependency closure over a registry snapshot.
//!
//! Resolution is a pure computation: it reads only the snapshot it is given
//! and produces either the complete resolved set or an error. There is no
//! partial success — a partially resolved sandbox would be a half-built
//! filesystem view.

use std::collections::VecDeque;

use log::debug;

use crate::dependency::DependencyTerm;
use crate::error::{Error, Result};
use crate::registry::{InstalledPackage, Snapshot};

/// Name of the package providing the minimal root filesystem skeleton.
/// Every resolution includes it implicitly.
pub const BASE_PACKAGE: &str = "base-system";

/// Deduplicated, insertion-ordered set of resolved packages.
///
/// Identity is `(name, version, entry directory)`: two resolution paths
/// reaching the same concrete package collapse to one entry. Insertion
/// order is the composer's layering order, base package first.
#[derive(Debug, Default)]
pub struct ResolvedSet {
    packages: Vec<InstalledPackage>,
}

impl ResolvedSet {
    /// Insert a package unless an identical one is present. Returns whether
    /// the package was newly inserted.
    fn insert(&mut self, package: InstalledPackage) -> bool {
        if self.contains(&package) {
            return false;
        }
        self.packages.push(package);
        true
    }

    pub fn contains(&self, package: &InstalledPackage) -> bool {
        self.packages.iter().any(|p| p == package)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstalledPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The base package: always the first entry, by construction.
    pub fn base(&self) -> Option<&InstalledPackage> {
        self.packages.first()
    }
}

impl FromIterator<InstalledPackage> for ResolvedSet {
    fn from_iter<I: IntoIterator<Item = InstalledPackage>>(iter: I) -> Self {
        let mut set = ResolvedSet::default();
        for package in iter {
            set.insert(package);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ResolvedSet {
    type Item = &'a InstalledPackage;
    type IntoIter = std::slice::Iter<'a, InstalledPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Computes the closure of a requested package set against one snapshot.
pub struct Resolver<'a> {
    snapshot: &'a Snapshot,
    base_package: String,
}

impl<'a> Resolver<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Resolver {
            snapshot,
            base_package: BASE_PACKAGE.to_string(),
        }
    }

    /// Override the base package name (scratch registries, tests).
    pub fn with_base(mut self, name: impl Into<String>) -> Self {
        self.base_package = name.into();
        self
    }

    /// Resolve the transitive closure of `initial`, always including the
    /// base package, even for an empty initial set.
    ///
    /// The worklist and result set are owned by this call: a package already
    /// in the result set is never expanded again, so dependency cycles and
    /// diamonds terminate with each package present exactly once. A term
    /// with no satisfying candidate fails the whole resolution with
    /// `UnresolvedDependency`.
    #[tracing::instrument(skip(self, initial))]
    pub fn resolve(&self, initial: &[InstalledPackage]) -> Result<ResolvedSet> {
        let mut resolved = ResolvedSet::default();
        let mut worklist: VecDeque<InstalledPackage> = VecDeque::new();

        let base = self
            .snapshot
            .newest(&self.base_package)
            .ok_or_else(|| Error::UnresolvedDependency {
                term: self.base_package.clone(),
            })?;
        worklist.push_back(base.clone());
        worklist.extend(initial.iter().cloned());

        while let Some(package) = worklist.pop_front() {
            if !resolved.insert(package.clone()) {
                continue;
            }
            debug!("resolving {} {}", package.name(), package.version);

            let expression = package.manifest.dependency_expression()?;
            for term in expression.terms() {
                let candidate = self.select(term)?;
                if !resolved.contains(candidate) {
                    worklist.push_back(candidate.clone());
                }
            }
        }

        Ok(resolved)
    }

    /// Pick the candidate for one term: among all installed packages that
    /// satisfy any alternative (searched by exact name), the newest by
    /// version ordering.
    fn select(&self, term: &DependencyTerm) -> Result<&'a InstalledPackage> {
        let mut best: Option<&InstalledPackage> = None;
        for constraint in term.alternatives() {
            for package in self.snapshot.find_by_name(&constraint.package, true) {
                if !constraint.satisfied_by(&package.version) {
                    continue;
                }
                if best.is_none_or(|b| package.version > b.version) {
                    best = Some(package);
                }
            }
        }
        best.ok_or_else(|| Error::UnresolvedDependency {
            term: term.to_string(),
        })
    }
}
