//! Container resolution
//!
//! The dispatcher asks a [`ContainerResolver`] which isolation boundary the
//! calling task belongs to. Resolution must be fast and side-effect free; any
//! failure is reported as "no container", which narrows matching to rules
//! with a wildcard container scope.

use std::path::PathBuf;

use crate::engine::Task;
use crate::rules::ContainerToken;

/// Resolves the container a task runs in
pub trait ContainerResolver: Send + Sync {
    fn resolve(&self, task: &Task) -> Option<ContainerToken>;
}

impl<F> ContainerResolver for F
where
    F: Fn(&Task) -> Option<ContainerToken> + Send + Sync,
{
    fn resolve(&self, task: &Task) -> Option<ContainerToken> {
        self(task)
    }
}

/// Never reports a container; every task matches only wildcard rules
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContainer;

impl ContainerResolver for NoContainer {
    fn resolve(&self, _task: &Task) -> Option<ContainerToken> {
        None
    }
}

/// Uses the task's cgroup path from `/proc/<pid>/cgroup` as its token.
///
/// The cgroup v2 (`0::`) entry is preferred; otherwise the first entry is
/// used. Tasks in the root cgroup are treated as uncontained.
#[derive(Debug, Clone)]
pub struct CgroupResolver {
    proc_root: PathBuf,
}

impl Default for CgroupResolver {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl CgroupResolver {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn cgroup_path(content: &str) -> Option<&str> {
        let mut first = None;

        for line in content.lines() {
            let mut fields = line.splitn(3, ':');
            let (Some(hierarchy), Some(_controllers), Some(path)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };

            if hierarchy == "0" {
                return Some(path);
            }
            first.get_or_insert(path);
        }

        first
    }
}

impl ContainerResolver for CgroupResolver {
    fn resolve(&self, task: &Task) -> Option<ContainerToken> {
        let path = self.proc_root.join(task.pid.to_string()).join("cgroup");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        match Self::cgroup_path(&content) {
            Some(cgroup) if !cgroup.is_empty() && cgroup != "/" => {
                Some(ContainerToken::new(cgroup))
            }
            _ => None,
        }
    }
}
