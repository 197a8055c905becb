//! Which tasks the current scholar may run, and where.

use serde::Serialize;

use corpora_core::{Jobsite, Scholar, Task};

/// A task offered on one jobsite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermittedTask {
    pub jobsite_id: String,
    pub jobsite_name: String,
    pub task: Task,
}

/// Tasks for `content_type` across every jobsite, restricted to those the
/// scholar may run. Admins may run everything. Ordered by jobsite, then task
/// name.
pub fn permitted_tasks(
    scholar: &Scholar,
    jobsites: &[Jobsite],
    tasks: &[Task],
    content_type: &str,
) -> Vec<PermittedTask> {
    let mut out: Vec<PermittedTask> = jobsites
        .iter()
        .flat_map(|site| {
            site.task_ids.iter().filter_map(move |task_id| {
                let task = tasks.iter().find(|t| &t.id == task_id)?;
                (task.content_type == content_type && scholar.may_run(&task.id)).then(|| {
                    PermittedTask {
                        jobsite_id: site.id.clone(),
                        jobsite_name: site.name.clone(),
                        task: task.clone(),
                    }
                })
            })
        })
        .collect();
    out.sort_by(|a, b| {
        (a.jobsite_name.as_str(), a.task.name.as_str())
            .cmp(&(b.jobsite_name.as_str(), b.task.name.as_str()))
    });
    out
}
