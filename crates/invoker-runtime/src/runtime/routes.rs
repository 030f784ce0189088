use crate::error::ConfigurationError;
use crate::function::PathPattern;
use crate::registry::{FunctionRegistry, Registration};
use std::collections::HashMap;

/// Request path to registration resolution.
///
/// Exact paths beat prefix patterns, longer prefixes beat shorter ones and the
/// catch-all pattern is the last resort.
#[derive(Debug)]
pub(crate) struct RouteTable {
    exact: HashMap<String, Registration>,
    // sorted by descending prefix length
    prefixes: Vec<(String, Registration)>,
    catch_all: Option<Registration>,
}

impl RouteTable {
    pub(crate) fn build(registry: &FunctionRegistry) -> Result<Self, ConfigurationError> {
        let mut owners: HashMap<PathPattern, &str> = HashMap::new();
        let mut table = RouteTable {
            exact: HashMap::new(),
            prefixes: Vec::new(),
            catch_all: None,
        };

        for registration in registry.iter() {
            let pattern = registration.route().pattern()?;

            if let Some(first) = owners.get(&pattern) {
                return Err(ConfigurationError::RouteConflict {
                    path: registration.route().path().to_string(),
                    first: first.to_string(),
                    second: registration.id().to_string(),
                });
            }
            owners.insert(pattern.clone(), registration.id());

            match pattern {
                PathPattern::Exact(path) => {
                    table.exact.insert(path, registration.clone());
                }
                PathPattern::Prefix(base) => table.prefixes.push((base, registration.clone())),
                PathPattern::CatchAll => table.catch_all = Some(registration.clone()),
            }
        }

        table
            .prefixes
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

        Ok(table)
    }

    pub(crate) fn resolve(&self, path: &str) -> Option<&Registration> {
        let normalized = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };

        if let Some(registration) = self.exact.get(normalized) {
            return Some(registration);
        }

        self.prefixes
            .iter()
            .find(|(base, _)| PathPattern::is_under(base, normalized))
            .map(|(_, registration)| registration)
            .or(self.catch_all.as_ref())
    }
}
