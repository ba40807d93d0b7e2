// SPDX-License-Identifier: GPL-3.0-only

//! Deferred work returned from `update`
//!
//! A [`Task`] is a set of futures, each resolving to an optional follow-up
//! [`Message`]. The runner (terminal loop, headless driver or test) decides
//! how to execute them and feeds the results back into `update`.

use super::state::Message;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;

/// Work requested by a state transition
#[must_use = "tasks do nothing unless executed"]
pub struct Task {
    futures: Vec<BoxFuture<'static, Option<Message>>>,
}

impl Task {
    /// No follow-up work
    pub fn none() -> Self {
        Self {
            futures: Vec::new(),
        }
    }

    /// Run `future` and map its output into a message
    pub fn perform<T, F, M>(future: F, map: M) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        M: FnOnce(T) -> Message + Send + 'static,
    {
        Self {
            futures: vec![future.map(|output| Some(map(output))).boxed()],
        }
    }

    /// Run `future` for its side effects only
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            futures: vec![future.map(|()| None).boxed()],
        }
    }

    pub fn is_none(&self) -> bool {
        self.futures.is_empty()
    }

    /// Split into independently runnable futures
    pub fn into_futures(self) -> Vec<BoxFuture<'static, Option<Message>>> {
        self.futures
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("futures", &self.futures.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_perform_maps_output() {
        let task = Task::perform(async { 2 + 2 }, |_| Message::Capture);
        let mut futures = task.into_futures();
        assert_eq!(futures.len(), 1);
        assert!(matches!(futures.remove(0).await, Some(Message::Capture)));
    }

    #[tokio::test]
    async fn test_side_effect_task_has_no_follow_up() {
        let task = Task::future(async {});
        assert!(!task.is_none());
        for future in task.into_futures() {
            assert!(future.await.is_none());
        }
        assert!(Task::none().is_none());
    }
}
