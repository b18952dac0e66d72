//! Recursive package-tree walk.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// One entry discovered under a package root, keyed by its path relative to
/// that root. Transient: produced while composing, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathEntry {
    pub rel: PathBuf,
    pub is_dir: bool,
}

/// List every directory and file under `root`, depth-first in sorted order.
/// The root itself is not listed. Symlinks are recorded as files and never
/// followed, so link cycles inside a package tree cannot loop the walk.
pub(crate) fn walk_tree<R: Runtime>(runtime: &R, root: &Path) -> Result<Vec<PathEntry>> {
    let mut entries = Vec::new();
    visit(runtime, root, root, &mut entries)?;
    Ok(entries)
}

fn visit<R: Runtime>(
    runtime: &R,
    root: &Path,
    dir: &Path,
    entries: &mut Vec<PathEntry>,
) -> Result<()> {
    for child in runtime.read_dir(dir)? {
        let rel = child
            .strip_prefix(root)
            .map_err(|_| Error::PathComputation {
                path: child.clone(),
                prefix: root.to_path_buf(),
            })?
            .to_path_buf();

        if !runtime.is_symlink(&child) && runtime.is_dir(&child) {
            entries.push(PathEntry { rel, is_dir: true });
            visit(runtime, root, &child, entries)?;
        } else {
            entries.push(PathEntry { rel, is_dir: false });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_walk_lists_dirs_and_files_depth_first() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/pkg/root");

        runtime
            .expect_read_dir()
            .with(eq(root.clone()))
            .returning(|p| Ok(vec![p.join("usr")]));
        runtime
            .expect_read_dir()
            .with(eq(root.join("usr")))
            .returning(|p| Ok(vec![p.join("bin"), p.join("share")]));
        runtime
            .expect_read_dir()
            .with(eq(root.join("usr/bin")))
            .returning(|p| Ok(vec![p.join("hello")]));
        runtime
            .expect_read_dir()
            .with(eq(root.join("usr/share")))
            .returning(|_| Ok(vec![]));

        runtime.expect_is_symlink().returning(|_| false);
        runtime
            .expect_is_dir()
            .returning(|p| p.extension().is_none() && !p.ends_with("hello"));

        let entries = walk_tree(&runtime, &root).unwrap();
        let listed: Vec<(String, bool)> = entries
            .iter()
            .map(|e| (e.rel.display().to_string(), e.is_dir))
            .collect();

        assert_eq!(
            listed,
            vec![
                ("usr".into(), true),
                ("usr/bin".into(), true),
                ("usr/bin/hello".into(), false),
                ("usr/share".into(), true),
            ]
        );
    }

    #[test]
    fn test_walk_does_not_descend_into_symlinks() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/pkg/root");

        runtime
            .expect_read_dir()
            .with(eq(root.clone()))
            .returning(|p| Ok(vec![p.join("bin"), p.join("usr")]));
        runtime
            .expect_read_dir()
            .with(eq(root.join("usr")))
            .returning(|_| Ok(vec![]));

        // bin is a symlink to usr/bin: listed, not walked.
        runtime
            .expect_is_symlink()
            .with(eq(root.join("bin")))
            .returning(|_| true);
        runtime
            .expect_is_symlink()
            .with(eq(root.join("usr")))
            .returning(|_| false);
        runtime.expect_is_dir().returning(|_| true);

        let entries = walk_tree(&runtime, &root).unwrap();
        assert_eq!(
            entries,
            vec![
                PathEntry {
                    rel: "bin".into(),
                    is_dir: false
                },
                PathEntry {
                    rel: "usr".into(),
                    is_dir: true
                },
            ]
        );
    }
}
