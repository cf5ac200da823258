// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution.
//!
//! Depth-first over direct and peer dependencies (plus the root's dev
//! dependencies), picking the greatest published version that satisfies each
//! constraint. Nodes are colored white/gray/black so a back edge to a gray
//! node reports the cycle path instead of recursing forever.

use crate::constraint::{greatest_satisfying, Constraint};
use crate::error::PackError;
use crate::registry::PackRegistry;
use crate::spec::PackSpec;
use crate::version::Version;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Packs to apply, leaves first and the requested pack last.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub order: Vec<PackSpec>,
}

impl Resolution {
    pub fn root(&self) -> Option<&PackSpec> {
        self.order.last()
    }

    /// `id@version` for every pack, in install order.
    pub fn summary(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|s| format!("{}@{}", s.id, s.version))
            .collect()
    }
}

/// Resolve the dependency closure of an already-loaded pack.
pub fn resolve<R: PackRegistry + ?Sized>(
    registry: &R,
    root: PackSpec,
) -> Result<Resolution, PackError> {
    let mut resolver = Resolver {
        registry,
        colors: HashMap::new(),
        chosen: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
    };
    resolver
        .chosen
        .insert(root.id.as_str().to_string(), root.version.clone());
    resolver.visit(root, true)?;
    Ok(Resolution {
        order: resolver.order,
    })
}

/// Pick the greatest version of `id` satisfying `constraint`, then resolve it.
pub fn resolve_id<R: PackRegistry + ?Sized>(
    registry: &R,
    id: &str,
    constraint: &Constraint,
) -> Result<Resolution, PackError> {
    let root = select(registry, id, constraint)?;
    resolve(registry, root)
}

fn select<R: PackRegistry + ?Sized>(
    registry: &R,
    id: &str,
    constraint: &Constraint,
) -> Result<PackSpec, PackError> {
    let versions = registry.versions(id)?;
    let Some(version) = greatest_satisfying(&versions, constraint) else {
        return Err(PackError::Unresolved {
            id: id.to_string(),
            constraint: constraint.to_string(),
        });
    };
    tracing::debug!(pack = id, %constraint, %version, "selected pack version");
    registry.load(id, version)
}

struct Resolver<'a, R: ?Sized> {
    registry: &'a R,
    colors: HashMap<String, Color>,
    chosen: HashMap<String, Version>,
    stack: Vec<String>,
    order: Vec<PackSpec>,
}

impl<R: PackRegistry + ?Sized> Resolver<'_, R> {
    fn visit(&mut self, spec: PackSpec, is_root: bool) -> Result<(), PackError> {
        let id = spec.id.as_str().to_string();
        self.colors.insert(id.clone(), Color::Gray);
        self.stack.push(id.clone());

        for (dep, constraint) in spec.dependency_edges(is_root) {
            match self.colors.get(dep) {
                Some(Color::Gray) => {
                    let start = self.stack.iter().position(|s| s == dep).unwrap_or(0);
                    let mut cycle = self.stack[start..].to_vec();
                    cycle.push(dep.to_string());
                    return Err(PackError::Circular { cycle });
                }
                Some(Color::Black) => {
                    self.check_compatible(dep, constraint, &id)?;
                }
                None => {
                    let child = select(self.registry, dep, constraint)?;
                    self.chosen.insert(dep.to_string(), child.version.clone());
                    self.visit(child, false)?;
                }
            }
        }

        self.stack.pop();
        self.colors.insert(id, Color::Black);
        self.order.push(spec);
        Ok(())
    }

    fn check_compatible(
        &self,
        dep: &str,
        constraint: &Constraint,
        required_by: &str,
    ) -> Result<(), PackError> {
        match self.chosen.get(dep) {
            Some(v) if !constraint.satisfies(v) => Err(PackError::VersionConflict {
                id: dep.to_string(),
                resolved: v.to_string(),
                constraint: constraint.to_string(),
                required_by: required_by.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
