// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};

/// Normalizes path separators to `/`, since reports may have been produced on
/// a different platform than the one reading them.
pub(crate) fn normalize_separators(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Resolves a raw source path from a report into workspace-relative form.
///
/// Separators are normalized first. When a shared checkout sub-directory is
/// configured for the job, that prefix is stripped as well: the checkout was
/// relocated below it, and records must name paths relative to the real
/// source tree.
pub(crate) fn workspace_relative(
    raw: &str,
    workspace_root: Option<&Utf8Path>,
    shared_checkout_dir: Option<&str>,
) -> Utf8PathBuf {
    let normalized = normalize_separators(raw);
    let path = Utf8Path::new(&normalized);

    let mut relative = match workspace_root {
        Some(root) => path.strip_prefix(root).unwrap_or(path),
        None => path,
    };

    if let Some(shared) = shared_checkout_dir {
        if let Ok(stripped) = relative.strip_prefix(shared) {
            relative = stripped;
        }
    }

    relative.to_owned()
}
