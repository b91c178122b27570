use std::path::{Component, Path, PathBuf};

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;

/// Walks up from `start` and returns the first directory containing `marker`.
pub fn find_project_root(start: &Path, marker: &str) -> Option<PathBuf> {
    start.ancestors().find(|dir| dir.join(marker).exists()).map(Path::to_path_buf)
}

/// Returns the path to use for `target` when referenced from inside `base`.
///
/// Both paths are taken relative to the same root. Absolute targets are returned unchanged.
/// Returns `None` when the answer depends on the working directory: `base` is absolute while
/// `target` is not, or `base` climbs out of the root through `..`.
pub fn relative_from(base: &Path, target: &Path) -> Option<PathBuf> {
    if target.is_absolute() {
        return Some(target.to_path_buf());
    }
    if base.is_absolute() || base.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }

    let base_components: Vec<Component<'_>> = normal_components(base);
    let target_components: Vec<Component<'_>> = normal_components(target);

    let common = base_components
        .iter()
        .zip(target_components.iter())
        .take_while(|(base, target)| base == target)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &target_components[common..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

// Drops `.` components so "./secrets" and "secrets" compare equal.
fn normal_components(path: &Path) -> Vec<Component<'_>> {
    path.components().filter(|component| !matches!(component, Component::CurDir)).collect()
}
