//! Mount table - routes exposed by loaded plugins
//!
//! Every plugin's routes live under `/api/<identifier>`. The table only records
//! and resolves them; attaching a server to them is the host's business.

use std::collections::HashMap;

use hotswap_plugin_api::{HttpMethod, MountPoint};
use serde::Serialize;

use crate::error::{RegistryError, Result};

/// A route as seen from outside: owning plugin, method and full path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedRoute {
    pub plugin: String,
    pub method: HttpMethod,
    pub path: String,
}

struct Entry {
    route: MountedRoute,
    pattern: Vec<Segment>,
}

enum Segment {
    Literal(String),
    Param(String),
}

fn compile(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

fn match_pattern(pattern: &[Segment], path: &str) -> Option<HashMap<String, String>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != pattern.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (segment, part) in pattern.iter().zip(parts) {
        match segment {
            Segment::Literal(expected) if expected == part => {}
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            }
        }
    }
    Some(params)
}

/// Full path of a plugin route
pub fn mount_path(plugin: &str, path: &str) -> String {
    format!("/api/{}/{}", plugin, path.trim_start_matches('/'))
        .trim_end_matches('/')
        .to_string()
}

#[derive(Default)]
pub struct MountTable {
    entries: Vec<Entry>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount all routes of a plugin, or none of them.
    ///
    /// Fails with `MountConflict` if any route is already mounted or appears
    /// twice in `mount`.
    pub fn mount(&mut self, plugin: &str, mount: &MountPoint) -> Result<()> {
        let mut staged: Vec<Entry> = Vec::with_capacity(mount.routes.len());

        for spec in &mount.routes {
            let full_path = mount_path(plugin, &spec.path);
            let taken_by = self
                .entries
                .iter()
                .chain(staged.iter())
                .find(|e| e.route.method == spec.method && e.route.path == full_path)
                .map(|e| e.route.plugin.clone());

            if let Some(existing) = taken_by {
                return Err(RegistryError::MountConflict {
                    id: plugin.to_string(),
                    route: format!("{:?} {}", spec.method, full_path),
                    existing,
                });
            }

            staged.push(Entry {
                pattern: compile(&full_path),
                route: MountedRoute {
                    plugin: plugin.to_string(),
                    method: spec.method,
                    path: full_path,
                },
            });
        }

        self.entries.extend(staged);
        Ok(())
    }

    /// Remove every route of a plugin
    pub fn unmount(&mut self, plugin: &str) {
        self.entries.retain(|e| e.route.plugin != plugin);
    }

    /// Find the route serving `method` and `path`, with extracted path parameters
    pub fn match_route(
        &self,
        method: HttpMethod,
        path: &str,
    ) -> Option<(&MountedRoute, HashMap<String, String>)> {
        self.entries.iter().find_map(|e| {
            if e.route.method != method {
                return None;
            }
            match_pattern(&e.pattern, path).map(|params| (&e.route, params))
        })
    }

    /// All mounted routes
    pub fn routes(&self) -> Vec<MountedRoute> {
        self.entries.iter().map(|e| e.route.clone()).collect()
    }

    pub fn is_mounted(&self, plugin: &str) -> bool {
        self.entries.iter().any(|e| e.route.plugin == plugin)
    }
}
