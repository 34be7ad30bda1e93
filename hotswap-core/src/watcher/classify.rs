//! Mapping raw filesystem paths to plugin change events

use std::path::{Component, Path};

use notify::{Event, EventKind};

use crate::descriptor::{CONFIG_FILE, DESCRIPTOR_FILE, is_reserved};
use crate::events::{ChangeEvent, ChangeKind};

/// Directory names whose contents never trigger a reaction
pub const IGNORED_DIRS: &[&str] = &[
    "assets",
    "temp",
    "tmp",
    "static",
    "cache",
    "__pycache__",
    "target",
];

fn is_ignored(name: &str) -> bool {
    IGNORED_DIRS.contains(&name) || is_reserved(name)
}

/// Classify a path under `root`.
///
/// Only `<root>/<id>/config.json` and `<root>/<id>/plugin.json` produce an event.
pub fn classify(root: &Path, path: &Path) -> Option<ChangeEvent> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let [id, file] = parts.as_slice() else {
        return None;
    };
    if is_ignored(id) {
        return None;
    }

    let kind = match *file {
        CONFIG_FILE => ChangeKind::ConfigChanged,
        DESCRIPTOR_FILE => ChangeKind::DescriptorChanged,
        _ => return None,
    };
    Some(ChangeEvent::new(*id, kind))
}

/// Change events carried by one notification. Only creations and
/// modifications count.
pub fn changes(root: &Path, event: &Event) -> Vec<ChangeEvent> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }

    let mut found: Vec<ChangeEvent> = Vec::new();
    for change in event.paths.iter().filter_map(|p| classify(root, p)) {
        if !found.contains(&change) {
            found.push(change);
        }
    }
    found
}
