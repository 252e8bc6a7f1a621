//! Origin-prefix routing
//!
//! Origins are dot-separated hierarchical names (`"a.b.c"`). A route prefix
//! matches its own name and every descendant on a dot boundary, so `"a.b"`
//! matches `"a.b"` and `"a.b.c"` but not `"a.bc"`. The empty prefix is the
//! root and matches everything.

use super::{
    error::{LoggerError, Result},
    severity::Severity,
};
use serde::{Deserialize, Serialize};

/// Binding from an origin prefix and a severity threshold to named sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "min_route_severity")]
    pub min_severity: Severity,
    pub sinks: Vec<String>,
}

fn min_route_severity() -> Severity {
    Severity::Trace
}

impl Route {
    pub fn new<I, S>(prefix: impl Into<String>, min_severity: Severity, sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            min_severity,
            sinks: sinks.into_iter().map(Into::into).collect(),
        }
    }

    /// Route matching every origin
    pub fn root<I, S>(min_severity: Severity, sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("", min_severity, sinks)
    }

    pub fn matches(&self, origin: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match origin.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}

/// Ordered set of routes; registration order breaks prefix-length ties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Longest matching prefix; the first registered wins among equals
    pub fn resolve(&self, origin: &str) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for route in self.routes.iter().filter(|r| r.matches(origin)) {
            match best {
                Some(current) if current.prefix.len() >= route.prefix.len() => {}
                _ => best = Some(route),
            }
        }
        best
    }

    /// Sinks that should receive an event of `severity` from `origin`.
    ///
    /// Empty when no route matches or the resolved route's threshold is not
    /// met. Per-sink thresholds are applied later by the sinks themselves.
    pub fn sinks_for(&self, origin: &str, severity: Severity) -> &[String] {
        match self.resolve(origin) {
            Some(route) if route.accepts(severity) => &route.sinks,
            _ => &[],
        }
    }

    /// Check every referenced sink name against `known`
    pub fn validate(&self, known: impl Fn(&str) -> bool) -> Result<()> {
        for route in &self.routes {
            if route.sinks.is_empty() {
                return Err(LoggerError::config(
                    format!("route '{}'", route.prefix),
                    "a route needs at least one sink",
                ));
            }
            if let Some(missing) = route.sinks.iter().find(|name| !known(name)) {
                return Err(LoggerError::UnknownSink {
                    prefix: route.prefix.clone(),
                    sink: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<Route>> for RouteTable {
    fn from(routes: Vec<Route>) -> Self {
        Self::new(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching_on_dot_boundary() {
        let route = Route::new("a.b", Severity::Trace, ["s"]);
        assert!(route.matches("a.b"));
        assert!(route.matches("a.b.c"));
        assert!(!route.matches("a.bc"));
        assert!(!route.matches("a"));
        assert!(Route::root(Severity::Trace, ["s"]).matches("anything.at.all"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::new(vec![
            Route::new("a", Severity::Trace, ["short"]),
            Route::new("a.b", Severity::Trace, ["long"]),
        ]);
        assert_eq!(table.resolve("a.b.c").unwrap().sinks, vec!["long"]);
        assert_eq!(table.resolve("a.x").unwrap().sinks, vec!["short"]);
        assert!(table.resolve("d.e.f").is_none());
    }

    #[test]
    fn test_first_registered_wins_tie() {
        let table = RouteTable::new(vec![
            Route::new("a.b", Severity::Trace, ["first"]),
            Route::new("a.b", Severity::Trace, ["second"]),
        ]);
        assert_eq!(table.resolve("a.b.c").unwrap().sinks, vec!["first"]);
    }

    #[test]
    fn test_root_is_fallback() {
        let table = RouteTable::new(vec![
            Route::root(Severity::Trace, ["root"]),
            Route::new("a", Severity::Trace, ["a"]),
        ]);
        assert_eq!(table.sinks_for("a.b", Severity::Info), ["a".to_string()]);
        assert_eq!(table.sinks_for("z", Severity::Info), ["root".to_string()]);
    }

    #[test]
    fn test_threshold_boundary() {
        let table = RouteTable::new(vec![Route::new("a", Severity::Warning, ["s"])]);
        assert!(table.sinks_for("a", Severity::Info).is_empty());
        assert_eq!(table.sinks_for("a", Severity::Warning).len(), 1);
        assert_eq!(table.sinks_for("a", Severity::Critical).len(), 1);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let table = RouteTable::new(vec![
            Route::new("a", Severity::Trace, ["x"]),
            Route::new("a.b", Severity::Debug, ["y", "z"]),
        ]);
        let first = table.sinks_for("a.b.c", Severity::Error).to_vec();
        let second = table.sinks_for("a.b.c", Severity::Error).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate_unknown_sink() {
        let table = RouteTable::new(vec![Route::new("a", Severity::Trace, ["console", "ghost"])]);
        let err = table.validate(|name| name == "console").unwrap_err();
        assert!(matches!(err, LoggerError::UnknownSink { ref sink, .. } if sink == "ghost"));
    }

    #[test]
    fn test_route_from_json_defaults() {
        let route: Route = serde_json::from_str(r#"{"sinks":["console"]}"#).unwrap();
        assert_eq!(route.prefix, "");
        assert_eq!(route.min_severity, Severity::Trace);
    }
}
