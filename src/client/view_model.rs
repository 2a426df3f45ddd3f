//! Presentation state for the task list
//!
//! Holds the list from the last successful fetch, tracks which items have a
//! change in flight, drives the gateway and reports failures as
//! notifications while leaving the list untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::cache::QueryCache;
use super::gateway::TaskApi;
use super::session::SessionManager;
use crate::domain::identity::{Identity, IdentityId};
use crate::domain::task::{Task, TaskId, TaskPatch};
use crate::domain::{AuthError, DomainError};

/// What a single item is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Idle,
    Updating,
    Deleting,
}

/// User-facing failure message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

enum Change {
    Update(TaskPatch),
    Delete,
}

type ItemStates = Arc<Mutex<HashMap<TaskId, ItemState>>>;

fn lock(states: &ItemStates) -> MutexGuard<'_, HashMap<TaskId, ItemState>> {
    states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks an item busy for as long as it lives
struct ItemGuard {
    states: ItemStates,
    id: TaskId,
}

impl ItemGuard {
    fn acquire(states: &ItemStates, id: TaskId, state: ItemState) -> Option<Self> {
        match lock(states).entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(state);
                Some(Self {
                    states: states.clone(),
                    id,
                })
            }
        }
    }
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        lock(&self.states).remove(&self.id);
    }
}

pub struct TaskViewModel {
    api: Arc<dyn TaskApi>,
    session: Arc<SessionManager>,
    cache: Arc<QueryCache>,
    list: RwLock<Option<(IdentityId, Vec<Task>)>>,
    item_states: ItemStates,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl TaskViewModel {
    /// Build the view-model and the receiving end of its notification channel
    pub fn new(
        api: Arc<dyn TaskApi>,
        session: Arc<SessionManager>,
        cache: Arc<QueryCache>,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, receiver) = mpsc::unbounded_channel();

        let view_model = Self {
            api,
            session,
            cache,
            list: RwLock::new(None),
            item_states: Arc::new(Mutex::new(HashMap::new())),
            notifications,
        };

        (view_model, receiver)
    }

    /// Refetch the full list for the signed-in identity
    pub async fn refresh(&self) -> Result<(), DomainError> {
        let result = self.fetch().await;
        self.report(result)
    }

    pub async fn add(&self, title: &str) -> Result<(), DomainError> {
        let result = async {
            let token = self.session.access_token()?;
            let task = self.rejected(&token, self.api.create(&token, title).await)?;
            debug!(task_id = %task.id(), "Todo added");
            self.fetch().await
        }
        .await;

        self.report(result)
    }

    pub async fn toggle(&self, id: TaskId, is_completed: bool) -> Result<(), DomainError> {
        self.change(id, Change::Update(TaskPatch::completion(is_completed)))
            .await
    }

    /// Rename with the trimmed title; blank or unchanged titles are ignored
    pub async fn rename(&self, id: TaskId, title: &str) -> Result<(), DomainError> {
        let title = title.trim();

        if title.is_empty() {
            return Ok(());
        }

        let unchanged = self
            .tasks()
            .await
            .iter()
            .any(|task| task.id() == &id && task.title() == title);
        if unchanged {
            return Ok(());
        }

        self.change(id, Change::Update(TaskPatch::title(title))).await
    }

    pub async fn delete(&self, id: TaskId) -> Result<(), DomainError> {
        self.change(id, Change::Delete).await
    }

    /// List from the last successful fetch for the signed-in identity, newest first
    ///
    /// Falls back to the shared query cache when this view-model has not
    /// fetched for the current identity yet.
    pub async fn tasks(&self) -> Vec<Task> {
        let mut list = self.list.write().await;

        let Some(identity) = self.session.current_identity() else {
            *list = None;
            return Vec::new();
        };

        if let Some((owner, tasks)) = list.as_ref() {
            if owner == identity.id() {
                return tasks.clone();
            }
        }

        *list = None;
        self.cache
            .get(identity.id())
            .await
            .map(|tasks| tasks.as_ref().clone())
            .unwrap_or_default()
    }

    pub async fn active_count(&self) -> usize {
        self.tasks()
            .await
            .iter()
            .filter(|task| !task.is_completed())
            .count()
    }

    pub fn item_state(&self, id: &TaskId) -> ItemState {
        lock(&self.item_states).get(id).copied().unwrap_or_default()
    }

    /// Run one change against a single item
    ///
    /// A second change to an item that already has one in flight is refused
    /// and reported like any other failure.
    async fn change(&self, id: TaskId, change: Change) -> Result<(), DomainError> {
        let state = match change {
            Change::Update(_) => ItemState::Updating,
            Change::Delete => ItemState::Deleting,
        };

        let Some(guard) = ItemGuard::acquire(&self.item_states, id, state) else {
            debug!(task_id = %id, "Ignoring change to busy item");
            return self.report(Err(DomainError::validation(
                "id",
                "another change to this item is in progress",
            )));
        };

        let result = async {
            let token = self.session.access_token()?;
            let result = match &change {
                Change::Update(patch) => self.api.update(&token, &id, patch).await.map(|_| ()),
                Change::Delete => self.api.delete(&token, &id).await,
            };
            self.rejected(&token, result)
        }
        .await;
        drop(guard);

        let result = match result {
            Ok(()) => self.fetch().await,
            Err(err) => Err(err),
        };
        self.report(result)
    }

    async fn fetch(&self) -> Result<(), DomainError> {
        let identity = self.signed_in()?;
        let token = self.session.access_token()?;
        let tasks = self.rejected(&token, self.api.list(&token).await)?;

        // The user may have changed while the request was in flight
        if self.session.current_identity().as_ref().map(Identity::id) == Some(identity.id()) {
            self.cache.insert(identity.id(), tasks.clone()).await;
            *self.list.write().await = Some((identity.id().clone(), tasks));
        }

        Ok(())
    }

    /// A token the gateway refused ends the session it belongs to
    fn rejected<T>(&self, token: &str, result: Result<T, DomainError>) -> Result<T, DomainError> {
        if result.as_ref().err().and_then(DomainError::auth_error) == Some(&AuthError::InvalidToken) {
            self.session.expire(token);
        }
        result
    }

    fn signed_in(&self) -> Result<Identity, DomainError> {
        self.session
            .current_identity()
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }

    fn report(&self, result: Result<(), DomainError>) -> Result<(), DomainError> {
        if let Err(err) = &result {
            warn!(error = %err, "Todo operation failed");
            if self.notifications.send(Notification::error(err.to_string())).is_err() {
                debug!("Notification receiver dropped");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::Notify;

    use crate::api::types::PublicConfigResponse;
    use crate::client::cache::QueryCacheConfig;
    use crate::client::gateway::MockTaskApi;
    use crate::domain::identity::{IdentityId, MockIdentityProvider, ProfileFields, Session};

    fn alice() -> Identity {
        Identity::new(IdentityId::new("user-a"), "alice@x.com", ProfileFields::default())
    }

    fn task(title: &str, done: bool) -> Task {
        Task::restore(
            TaskId::generate(),
            alice().id().clone(),
            title,
            done,
            Utc::now(),
        )
    }

    async fn signed_in(cache: Arc<QueryCache>) -> Arc<SessionManager> {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Ok(Session::new("token-a", Utc::now() + Duration::hours(1), alice())));

        let session = Arc::new(SessionManager::new(Arc::new(provider), cache));
        session.initialize(None).await;
        session.sign_in("alice@x.com", "secret1").await.unwrap();
        session
    }

    async fn view_model(
        api: impl TaskApi + 'static,
    ) -> (TaskViewModel, mpsc::UnboundedReceiver<Notification>) {
        let cache = Arc::new(QueryCache::new());
        let session = signed_in(cache.clone()).await;
        TaskViewModel::new(Arc::new(api), session, cache)
    }

    #[tokio::test]
    async fn test_refresh_fills_list() {
        let tasks = vec![task("second", false), task("first", true)];
        let expected = tasks.clone();

        let mut api = MockTaskApi::new();
        api.expect_list()
            .withf(|token| token == "token-a")
            .returning(move |_| Ok(tasks.clone()));

        let (vm, _) = view_model(api).await;
        vm.refresh().await.unwrap();

        assert_eq!(vm.tasks().await, expected);
        assert_eq!(vm.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_add_creates_then_refetches() {
        let created = task("Write spec", false);
        let listed = vec![created.clone()];

        let mut api = MockTaskApi::new();
        api.expect_create()
            .withf(|token, title| token == "token-a" && title == "Write spec")
            .times(1)
            .returning(move |_, _| Ok(created.clone()));
        api.expect_list().times(1).returning(move |_| Ok(listed.clone()));

        let (vm, _) = view_model(api).await;
        vm.add("Write spec").await.unwrap();

        assert_eq!(vm.tasks().await.len(), 1);
        assert_eq!(vm.tasks().await[0].title(), "Write spec");
    }

    #[tokio::test]
    async fn test_failed_toggle_notifies_and_keeps_list() {
        let existing = task("Write spec", false);
        let id = *existing.id();
        let listed = vec![existing];

        let mut api = MockTaskApi::new();
        api.expect_list().times(1).returning(move |_| Ok(listed.clone()));
        api.expect_update()
            .returning(|_, _, _| Err(DomainError::network("connection reset")));

        let (vm, mut notifications) = view_model(api).await;
        vm.refresh().await.unwrap();

        assert!(vm.toggle(id, true).await.is_err());

        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification.title, "Error");
        assert!(notification.message.contains("connection reset"));
        assert_eq!(vm.item_state(&id), ItemState::Idle);
        assert!(!vm.tasks().await[0].is_completed());
    }

    #[tokio::test]
    async fn test_list_outlives_cache_expiry() {
        let existing = task("Write spec", false);
        let id = *existing.id();
        let listed = vec![existing];

        let mut api = MockTaskApi::new();
        api.expect_list().times(1).returning(move |_| Ok(listed.clone()));
        api.expect_update()
            .returning(|_, _, _| Err(DomainError::network("connection reset")));

        let cache = Arc::new(QueryCache::with_config(QueryCacheConfig {
            max_capacity: 4,
            time_to_live: std::time::Duration::from_millis(50),
        }));
        let session = signed_in(cache.clone()).await;
        let (vm, _notifications) = TaskViewModel::new(Arc::new(api), session, cache.clone());

        vm.refresh().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert!(cache.get(alice().id()).await.is_none());

        assert!(vm.toggle(id, true).await.is_err());
        let tasks = vm.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "Write spec");
    }

    #[tokio::test]
    async fn test_rejected_token_ends_session() {
        let mut api = MockTaskApi::new();
        api.expect_list()
            .times(1)
            .returning(|_| Err(AuthError::InvalidToken.into()));

        let cache = Arc::new(QueryCache::new());
        let session = signed_in(cache.clone()).await;
        let mut subscription = session.subscribe();
        assert!(subscription.next().await.unwrap().identity.is_some());

        let (vm, mut notifications) = TaskViewModel::new(Arc::new(api), session.clone(), cache);

        let err = vm.refresh().await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::InvalidToken));
        assert_eq!(notifications.recv().await.unwrap().title, "Error");

        assert!(subscription.next().await.unwrap().identity.is_none());
        assert!(session.current_identity().is_none());
        assert!(vm.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_rename_ignores_blank_and_unchanged() {
        let existing = task("Write spec", false);
        let id = *existing.id();
        let listed = vec![existing];

        let mut api = MockTaskApi::new();
        api.expect_list().times(1).returning(move |_| Ok(listed.clone()));
        api.expect_update().never();

        let (vm, _) = view_model(api).await;
        vm.refresh().await.unwrap();

        vm.rename(id, "   ").await.unwrap();
        vm.rename(id, "  Write spec ").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_sends_trimmed_title() {
        let existing = task("Write spec", false);
        let id = *existing.id();
        let listed = vec![existing.clone()];

        let mut api = MockTaskApi::new();
        api.expect_list().returning(move |_| Ok(listed.clone()));
        api.expect_update()
            .withf(move |token, task_id, patch| {
                token == "token-a" && *task_id == id && patch.title.as_deref() == Some("Ship it")
            })
            .times(1)
            .returning(move |_, _, _| Ok(existing.clone()));

        let (vm, _) = view_model(api).await;
        vm.refresh().await.unwrap();
        vm.rename(id, "  Ship it  ").await.unwrap();
    }

    #[tokio::test]
    async fn test_not_signed_in_is_reported() {
        let cache = Arc::new(QueryCache::new());
        let session = Arc::new(SessionManager::new(
            Arc::new(MockIdentityProvider::new()),
            cache.clone(),
        ));
        session.initialize(None).await;

        let (vm, mut notifications) =
            TaskViewModel::new(Arc::new(MockTaskApi::new()), session, cache);

        let err = vm.refresh().await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::NotSignedIn));
        assert_eq!(notifications.recv().await.unwrap().title, "Error");
        assert!(vm.tasks().await.is_empty());
    }

    /// Holds updates until released so a second change can race the first
    struct GatedApi {
        gate: Arc<Notify>,
        task: Task,
    }

    #[async_trait]
    impl TaskApi for GatedApi {
        async fn list(&self, _token: &str) -> Result<Vec<Task>, DomainError> {
            Ok(vec![self.task.clone()])
        }

        async fn create(&self, _token: &str, _title: &str) -> Result<Task, DomainError> {
            unreachable!("not used")
        }

        async fn update(
            &self,
            _token: &str,
            _id: &TaskId,
            _patch: &TaskPatch,
        ) -> Result<Task, DomainError> {
            self.gate.notified().await;
            Ok(self.task.clone())
        }

        async fn delete(&self, _token: &str, _id: &TaskId) -> Result<(), DomainError> {
            panic!("delete must not reach the gateway while an update is in flight");
        }

        async fn public_config(&self) -> Result<PublicConfigResponse, DomainError> {
            unreachable!("not used")
        }
    }

    #[tokio::test]
    async fn test_busy_item_rejects_second_change() {
        let existing = task("Write spec", false);
        let id = *existing.id();
        let gate = Arc::new(Notify::new());

        let (vm, mut notifications) = view_model(GatedApi {
            gate: gate.clone(),
            task: existing,
        })
        .await;
        let vm = Arc::new(vm);

        let pending = tokio::spawn({
            let vm = vm.clone();
            async move { vm.toggle(id, true).await }
        });

        while vm.item_state(&id) != ItemState::Updating {
            tokio::task::yield_now().await;
        }

        assert!(vm.delete(id).await.is_err());
        assert_eq!(vm.item_state(&id), ItemState::Updating);
        let notification = notifications.try_recv().unwrap();
        assert!(notification.message.contains("in progress"));

        gate.notify_one();
        pending.await.unwrap().unwrap();

        assert_eq!(vm.item_state(&id), ItemState::Idle);
        assert_eq!(vm.tasks().await.len(), 1);
    }
}
