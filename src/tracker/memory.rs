//! In-process Task Store Gateway for tests and `--offline` runs.
//!
//! Mirrors the remote tracker's observable behavior: ids assigned on
//! creation, reverse-chronological listing, status kept as metadata, and no
//! compare-and-swap — writes overwrite whatever is there.

use tokio::sync::Mutex;

use crate::error::{CoordError, Result};

use super::{NewTask, StateFilter, Task, TaskFilter, TaskStatus, TaskTracker};

#[derive(Default)]
pub struct MemoryTracker {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    /// Insertion order; listings return newest-first.
    tasks: Vec<Stored>,
}

struct Stored {
    task: Task,
    comments: Vec<String>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comments appended to a task, oldest first. Test hook — the real
    /// tracker exposes comments only through its own UI/API.
    pub async fn comments(&self, id: u64) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .tasks
            .iter()
            .find(|s| s.task.id == id)
            .map(|s| s.comments.clone())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl TaskTracker for MemoryTracker {
    async fn create(&self, new: NewTask) -> Result<Task> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        let task = Task {
            id,
            title: new.title,
            description: new.description,
            assignee: new.assignee,
            status: TaskStatus::Ready,
            priority: new.priority,
            component: new.component,
            open: true,
            url: format!("memory://tasks/{id}"),
        };
        inner.tasks.push(Stored {
            task: task.clone(),
            comments: Vec::new(),
        });
        Ok(task)
    }

    async fn get(&self, id: u64) -> Result<Task> {
        let inner = self.inner.lock().await;
        inner
            .tasks
            .iter()
            .find(|s| s.task.id == id)
            .map(|s| s.task.clone())
            .ok_or(CoordError::NotFound(id))
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tasks
            .iter()
            .rev() // newest-first, like the remote tracker
            .filter(|s| match filter.state {
                StateFilter::Open => s.task.open,
                StateFilter::Closed => !s.task.open,
                StateFilter::All => true,
            })
            .filter(|s| filter.assignee.map_or(true, |a| s.task.assignee == a))
            .filter(|s| filter.status.map_or(true, |st| s.task.status == st))
            .map(|s| s.task.clone())
            .collect())
    }

    async fn set_status(&self, id: u64, status: TaskStatus) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .tasks
            .iter_mut()
            .find(|s| s.task.id == id)
            .ok_or(CoordError::NotFound(id))?;
        stored.task.status = status;
        Ok(())
    }

    async fn add_comment(&self, id: u64, body: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .tasks
            .iter_mut()
            .find(|s| s.task.id == id)
            .ok_or(CoordError::NotFound(id))?;
        stored.comments.push(body.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn new_task(title: &str, assignee: Identity) -> NewTask {
        NewTask {
            title: title.into(),
            description: String::new(),
            assignee,
            priority: None,
            component: None,
        }
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let tracker = MemoryTracker::new();
        tracker.create(new_task("first", Identity::Cursor)).await.unwrap();
        tracker.create(new_task("second", Identity::Cursor)).await.unwrap();

        let tasks = tracker.list(&TaskFilter::default()).await.unwrap();
        assert_eq!(tasks[0].title, "second");
        assert_eq!(tasks[1].title, "first");
    }

    #[tokio::test]
    async fn status_write_is_visible_on_reread() {
        let tracker = MemoryTracker::new();
        let task = tracker.create(new_task("t", Identity::Codex)).await.unwrap();
        tracker.set_status(task.id, TaskStatus::Blocked).await.unwrap();
        assert_eq!(tracker.get(task.id).await.unwrap().status, TaskStatus::Blocked);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let tracker = MemoryTracker::new();
        assert!(matches!(
            tracker.get(999).await,
            Err(CoordError::NotFound(999))
        ));
    }
}
