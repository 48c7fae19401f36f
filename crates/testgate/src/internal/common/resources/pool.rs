use thiserror::Error;

use crate::internal::common::resources::{ResourceAmount, ResourceName, ResourceSet};

/// A demand that cannot be satisfied even by the whole declared capacity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("test requires {requested} {resource}, {available} available")]
pub struct InfeasibleDemand {
    pub resource: ResourceName,
    pub requested: ResourceAmount,
    pub available: ResourceAmount,
}

/// Checks `demand` against the immutable `total`, ignoring what is currently allocated.
///
/// Resource types are checked in name order, so the reported type is deterministic
/// when more than one of them is infeasible.
pub fn check_feasibility(
    total: &ResourceSet,
    demand: &ResourceSet,
) -> Result<(), InfeasibleDemand> {
    for (name, requested) in demand.sorted() {
        match total.get(name) {
            Some(available) if requested <= available => {}
            available => {
                return Err(InfeasibleDemand {
                    resource: name.to_string(),
                    requested,
                    available: available.unwrap_or(ResourceAmount::ZERO),
                });
            }
        }
    }
    Ok(())
}

/// Total and unallocated capacity.
///
/// Every resource type keeps `unallocated <= total` as long as callers release exactly
/// what they reserved. Releases are not validated.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    total: ResourceSet,
    unallocated: ResourceSet,
}

impl ResourcePool {
    pub fn new(total: ResourceSet) -> Self {
        ResourcePool {
            unallocated: total.clone(),
            total,
        }
    }

    #[inline]
    pub fn total(&self) -> &ResourceSet {
        &self.total
    }

    #[inline]
    pub fn unallocated(&self) -> &ResourceSet {
        &self.unallocated
    }

    /// Amount of `name` currently held by granted requests.
    pub fn allocated(&self, name: &str) -> ResourceAmount {
        self.total
            .amount(name)
            .checked_sub(self.unallocated.amount(name))
            .unwrap_or(ResourceAmount::ZERO)
    }

    pub fn is_fully_free(&self) -> bool {
        self.total == self.unallocated
    }

    pub fn check_feasible(&self, demand: &ResourceSet) -> Result<(), InfeasibleDemand> {
        check_feasibility(&self.total, demand)
    }

    /// Reserves the whole `demand` or nothing.
    pub fn try_reserve(&mut self, demand: &ResourceSet) -> bool {
        let fits = demand.iter().all(|(name, requested)| {
            self.unallocated
                .get(name)
                .is_some_and(|free| free >= requested)
        });
        if !fits {
            return false;
        }
        for (name, requested) in demand.iter() {
            if let Some(free) = self.unallocated.get_mut(name) {
                *free -= requested;
            }
        }
        true
    }

    pub fn release(&mut self, amount: &ResourceSet) {
        for (name, released) in amount.iter() {
            *self.unallocated.entry_mut(name) += released;
        }
    }
}
