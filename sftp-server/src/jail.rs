use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Maps virtual POSIX-style client paths onto a physical root and refuses to
/// let any of them escape it (§4.2). Construction fixes the root once; every
/// subsequent resolution is infallible: traversal is clamped, not rejected.
#[derive(Debug, Clone)]
pub struct Jail {
    root: PathBuf,
}

impl Jail {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Jail { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied virtual path to a physical path guaranteed
    /// to sit under the root. Never fails: an out-of-bounds path clamps to
    /// the root itself (§4.2 step 4).
    pub fn resolve(&self, virtual_path: &str) -> PathBuf {
        if virtual_path.is_empty() || virtual_path == "." || virtual_path == "/" {
            return self.root.clone();
        }

        let relative = virtual_path.strip_prefix('/').unwrap_or(virtual_path);

        // Resolve ".."/"." lexically against the root's OWN components, not
        // a fresh per-request stack: the target may not exist yet (OPEN with
        // create, MKDIR), so `fs::canonicalize` can't be used, but a leading
        // ".." still has to be able to walk back out of the root the same
        // way it would against a real filesystem join, or it silently lands
        // on a sibling path under the root instead of escaping it (§4.2
        // steps 3-4).
        let root_components: Vec<Component> = self.root.components().collect();
        let mut stack = root_components.clone();
        for segment in relative.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    stack.pop();
                }
                other => stack.push(Component::Normal(OsStr::new(other))),
            }
        }

        if stack.len() >= root_components.len() && stack[..root_components.len()] == root_components[..] {
            stack.into_iter().collect()
        } else {
            self.root.clone()
        }
    }

    /// Inverse of `resolve`: turn a physical path known to live under the
    /// root back into a "/"-rooted virtual path. The root itself becomes
    /// "/".
    pub fn to_virtual(&self, physical: &Path) -> String {
        let Ok(relative) = physical.strip_prefix(&self.root) else {
            return "/".to_string();
        };

        let mut virtual_path = String::from("/");
        for (i, component) in relative.components().enumerate() {
            if let Component::Normal(segment) = component {
                if i > 0 {
                    virtual_path.push('/');
                }
                virtual_path.push_str(&segment.to_string_lossy());
            }
        }
        virtual_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jail() -> Jail {
        Jail::new("/srv/sftp")
    }

    #[test]
    fn empty_dot_and_slash_resolve_to_root() {
        let jail = jail();
        assert_eq!(jail.resolve(""), jail.root());
        assert_eq!(jail.resolve("."), jail.root());
        assert_eq!(jail.resolve("/"), jail.root());
    }

    #[test]
    fn plain_relative_path_joins_root() {
        let jail = jail();
        assert_eq!(jail.resolve("/a/b"), jail.root().join("a").join("b"));
    }

    #[test]
    fn traversal_clamps_to_root() {
        let jail = jail();
        assert_eq!(jail.resolve("/../../etc/passwd"), jail.root());
        assert_eq!(jail.resolve("../../../x"), jail.root());
    }

    #[test]
    fn internal_dotdot_still_contained_resolves_normally() {
        let jail = jail();
        assert_eq!(jail.resolve("/a/../b"), jail.root().join("b"));
    }

    #[test]
    fn to_virtual_round_trips_root() {
        let jail = jail();
        assert_eq!(jail.to_virtual(jail.root()), "/");
    }

    #[test]
    fn to_virtual_strips_root_prefix() {
        let jail = jail();
        let physical = jail.root().join("a").join("b");
        assert_eq!(jail.to_virtual(&physical), "/a/b");
    }
}
