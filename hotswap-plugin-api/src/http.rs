//! Mountable interface types
//!
//! A plugin describes the externally reachable operations it offers as a
//! [`MountPoint`]. The host records them; serving them is up to whatever surface
//! the host attaches (for example an HTTP router).

use serde::{Deserialize, Serialize};

/// HTTP method for route registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

/// Specification for a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// HTTP method
    pub method: HttpMethod,
    /// Path pattern relative to the plugin's mount prefix, e.g. "/status" or "/items/:id"
    pub path: String,
}

impl RouteSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// The set of routes a plugin asks the host to attach
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub routes: Vec<RouteSpec>,
}

impl MountPoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a route
    pub fn route(mut self, method: HttpMethod, path: impl Into<String>) -> Self {
        self.routes.push(RouteSpec::new(method, path));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), "\"GET\"");
        assert_eq!(
            serde_json::from_str::<HttpMethod>("\"PATCH\"").unwrap(),
            HttpMethod::Patch
        );
    }

    #[test]
    fn test_mount_point_builder() {
        let mount = MountPoint::new()
            .route(HttpMethod::Get, "/status")
            .route(HttpMethod::Post, "/items/:id");

        assert_eq!(mount.routes.len(), 2);
        assert_eq!(mount.routes[1], RouteSpec::new(HttpMethod::Post, "/items/:id"));
        assert!(!mount.is_empty());
        assert!(MountPoint::new().is_empty());
    }
}
