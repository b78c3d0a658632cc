//! Marker-cartridge policy check
//!
//! A marker cartridge implements functionality for one application, so it may
//! only appear in the dependencies of the top-level cartridges that application
//! allows it for.

use std::collections::{BTreeMap, BTreeSet};

/// `key → [value, ...]` assignment table
pub type Assignments = BTreeMap<String, Vec<String>>;

/// Application and marker-cartridge assignments to check trails against
#[derive(Debug, Clone, Default)]
pub struct MarkerPolicy {
    /// application → its top-level cartridges
    app_top_level: Assignments,
    /// top-level cartridge → marker cartridges allowed below it
    allowed_markers: Assignments,
}

impl MarkerPolicy {
    pub fn new(app_top_level: Assignments, allowed_markers: Assignments) -> Self {
        Self {
            app_top_level,
            allowed_markers,
        }
    }

    /// Parse a `key = a, b, c` table; blank lines and `#` comments are skipped
    pub fn parse_assignments(content: &str) -> Assignments {
        let mut table = Assignments::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, values)) = line.split_once('=') else {
                continue;
            };
            table.insert(
                key.trim().to_string(),
                values
                    .split(',')
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.app_top_level.is_empty() || self.allowed_markers.is_empty()
    }

    fn is_marker(&self, cartridge: &str) -> bool {
        self.allowed_markers
            .values()
            .any(|allowed| allowed.iter().any(|c| c == cartridge))
    }

    fn allowed_elsewhere(&self, cartridge: &str, top_level: &str) -> bool {
        self.allowed_markers
            .iter()
            .any(|(other, allowed)| other != top_level && allowed.iter().any(|c| c == cartridge))
    }

    /// Describe every marker cartridge used below a top-level cartridge it is
    /// not allowed for
    ///
    /// A dependency is a violation when it is a marker cartridge, is not
    /// allowed for its top-level cartridge, and is allowed for another one.
    pub fn check<S: AsRef<str>>(&self, trails: &[S]) -> BTreeSet<String> {
        let dependencies = trail_dependencies(trails);
        let mut faults = BTreeSet::new();

        for (application, top_levels) in &self.app_top_level {
            for top_level in top_levels {
                let Some(all) = dependencies.get(top_level) else {
                    continue;
                };
                let allowed = self.allowed_markers.get(top_level);
                for cartridge in all {
                    let permitted = allowed.is_some_and(|list| list.contains(cartridge));
                    if self.is_marker(cartridge)
                        && !permitted
                        && self.allowed_elsewhere(cartridge, top_level)
                    {
                        faults.insert(format!(
                            "Marker cartridge '{}' found in top-level cartridge '{}' (application: {})",
                            cartridge, top_level, application
                        ));
                    }
                }
            }
        }
        faults
    }
}

/// First element of each trail → every element that follows it
pub fn trail_dependencies<S: AsRef<str>>(trails: &[S]) -> BTreeMap<String, BTreeSet<String>> {
    let mut result: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for trail in trails {
        let trail = trail.as_ref().trim();
        if trail.is_empty() || trail.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trail
            .split('>')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        let Some((top_level, rest)) = parts.split_first() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        result
            .entry(top_level.to_string())
            .or_default()
            .extend(rest.iter().map(|part| part.to_string()));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MarkerPolicy {
        MarkerPolicy::new(
            MarkerPolicy::parse_assignments(
                "# apps\nintershop.SMC = app_sf_smc\nintershop.B2C=app_sf_b2c, \n",
            ),
            MarkerPolicy::parse_assignments("app_sf_smc = smc\napp_sf_b2c = b2c_marker\n"),
        )
    }

    #[test]
    fn test_parse_assignments() {
        let table = MarkerPolicy::parse_assignments("a = x, y,, z\n\n# c = ignored\nbroken line\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table["a"], vec!["x", "y", "z"]);
    }

    #[test]
    fn test_marker_in_wrong_top_level_is_reported() {
        let faults = policy().check(&["app_sf_b2c > app_core > smc", "app_sf_smc > smc"]);

        assert_eq!(faults.len(), 1);
        assert_eq!(
            faults.into_iter().next().unwrap(),
            "Marker cartridge 'smc' found in top-level cartridge 'app_sf_b2c' (application: intershop.B2C)"
        );
    }

    #[test]
    fn test_non_marker_dependencies_pass() {
        assert!(policy().check(&["app_sf_b2c > app_core > b2c_marker"]).is_empty());
        assert!(policy().check(&["unrelated > smc"]).is_empty());
    }

    #[test]
    fn test_trail_dependencies() {
        let deps = trail_dependencies(&["a > b > c", "a > d", "# comment", "lonely"]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps["a"].len(), 3);
    }
}
