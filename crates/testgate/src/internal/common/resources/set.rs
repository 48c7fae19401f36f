use std::str::FromStr;

use crate::internal::common::Map;
use crate::internal::common::error::GateError;
use crate::internal::common::parser::{consume_all, p_resource_entries};
use crate::internal::common::resources::{ResourceAmount, ResourceName};

/// Quantity per resource type.
///
/// The same type describes the declared total capacity, the currently unallocated
/// capacity and the demand of a single task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    amounts: Map<ResourceName, ResourceAmount>,
}

impl ResourceSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insertion, `ResourceSet::new().with("cpu", 8).with("memory", 32)`.
    pub fn with(mut self, name: impl Into<ResourceName>, amount: u64) -> Self {
        self.insert(name, ResourceAmount::new(amount));
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<ResourceName>,
        amount: ResourceAmount,
    ) -> Option<ResourceAmount> {
        self.amounts.insert(name.into(), amount)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<ResourceAmount> {
        self.amounts.get(name).copied()
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResourceAmount> {
        self.amounts.get_mut(name)
    }

    /// Returns the amount of `name`, or zero when the type is not present.
    #[inline]
    pub fn amount(&self, name: &str) -> ResourceAmount {
        self.get(name).unwrap_or(ResourceAmount::ZERO)
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> &mut ResourceAmount {
        self.amounts.entry(name.to_string()).or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Iterates entries in an unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceAmount)> {
        self.amounts
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
    }

    /// Entries ordered by resource name.
    pub fn sorted(&self) -> Vec<(&str, ResourceAmount)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries
    }

    /// Reads a set such as `cpu=16,memory=64` from the environment variable `var`.
    /// Returns `Ok(None)` when the variable is not set.
    pub fn from_env(var: &str) -> crate::Result<Option<Self>> {
        match std::env::var(var) {
            Ok(value) => value.parse().map(Some).map_err(|e: GateError| {
                GateError::ConfigError(format!("Invalid value of {var}: {e}"))
            }),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(GateError::ConfigError(format!("Cannot read {var}: {e}"))),
        }
    }
}

impl FromStr for ResourceSet {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries = consume_all(p_resource_entries, s)?;
        let mut set = ResourceSet::new();
        for (name, amount) in entries {
            if set.insert(name, ResourceAmount::new(amount)).is_some() {
                return Err(GateError::ConfigError(format!(
                    "Resource '{name}' is defined more than once"
                )));
            }
        }
        Ok(set)
    }
}

impl std::fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, (name, amount)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={amount}")?;
        }
        Ok(())
    }
}

impl<S: Into<ResourceName>> FromIterator<(S, u64)> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut set = ResourceSet::new();
        for (name, amount) in iter {
            set.insert(name, ResourceAmount::new(amount));
        }
        set
    }
}
