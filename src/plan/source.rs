//! Source identities and cross-source references.
//!
//! Purely lexical: no filesystem access, so synthetic ids and paths that
//! do not exist on disk resolve the same way.

use std::path::{Component, Path, PathBuf};

/// Suffix every plan file carries.
pub const PLAN_EXTENSION: &str = ".plan.md";

/// Removes `.` segments and folds `..` into the preceding segment.
pub fn normalize_source(path: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts
        .iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}

/// `notes` and `notes.md` both become `notes.plan.md`.
pub fn append_plan_extension(name: &str) -> String {
    if name.ends_with(PLAN_EXTENSION) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{PLAN_EXTENSION}"))
        .to_string_lossy()
        .into_owned()
}

/// Resolves `reference` relative to the directory of `from`.
pub fn resolve_source(from: &str, reference: &str) -> String {
    let dir = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
    let joined = dir.join(append_plan_extension(reference.trim()));
    normalize_source(&joined.to_string_lossy())
}

/// Splits a dependency reference into (source, fragment).
///
/// `file:fragment` names both; a reference containing `/` names only a
/// source; anything else is a fragment in the referencing source.
/// Empty parts become `None`. More than one `:` is rejected.
pub(crate) fn split_reference(reference: &str) -> Option<(Option<&str>, Option<&str>)> {
    fn non_empty(s: &str) -> Option<&str> {
        let s = s.trim();
        (!s.is_empty()).then_some(s)
    }

    if reference.contains(':') {
        let (source, fragment) = reference.split_once(':')?;
        if fragment.contains(':') {
            return None;
        }
        Some((non_empty(source), non_empty(fragment)))
    } else if reference.contains('/') {
        Some((non_empty(reference), None))
    } else {
        Some((None, non_empty(reference)))
    }
}
