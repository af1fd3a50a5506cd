//! In-memory todo list kept in step with the backend.
//!
//! # Design
//! The controller owns the session's copy of the list. Every mutation is a
//! request–await–reconcile chain: the store call runs first and only a
//! successful response is mirrored locally (prepend, update in place,
//! remove in place). A failed call leaves `items` untouched and hands the
//! error back to the caller. Load failures have no caller to go to, so they
//! are turned into a one-shot notice instead.
//!
//! Overlapping calls follow a fixed policy: one add at a time, one
//! mutation per id at a time, one load at a time. Every reconcile bumps a
//! generation counter; a list response fetched before the latest reconcile
//! is stale and is fetched again instead of overwriting confirmed changes.
//! Once `close` has been called no response is applied any more, so a
//! torn-down view never sees late writes.
//!
//! The list lock is never held across a network call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::error::ControllerError;
use crate::store::TodoStore;
use crate::transport::Transport;
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

/// Notice left for the presentation layer when a load fails.
pub const LOAD_FAILED: &str = "Failed to load todos";

/// Fetches per load before a list that keeps changing is given up on.
const LOAD_ATTEMPTS: usize = 3;

/// Owned copy of the list state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pub items: Vec<Todo>,
    pub loading: bool,
    pub refreshing: bool,
}

impl ListSnapshot {
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|todo| todo.completed).count()
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.items.iter().find(|todo| &todo.id == id)
    }
}

#[derive(Debug)]
struct ListState {
    items: Vec<Todo>,
    /// Set until the first load settles.
    loading: bool,
    refreshing: bool,
    notice: Option<String>,
    generation: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            refreshing: false,
            notice: None,
            generation: 0,
        }
    }
}

impl ListState {
    fn settle(&mut self, kind: LoadKind) {
        self.loading = false;
        if let LoadKind::Refresh = kind {
            self.refreshing = false;
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    adding: bool,
    loading: bool,
    items: HashSet<TodoId>,
}

#[derive(Debug)]
enum Slot {
    Add,
    Load,
    Item(TodoId),
}

/// Marks a request as outstanding until dropped.
struct Claim<'a> {
    in_flight: &'a Mutex<InFlight>,
    slot: Slot,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        match &self.slot {
            Slot::Add => in_flight.adding = false,
            Slot::Load => in_flight.loading = false,
            Slot::Item(id) => {
                in_flight.items.remove(id);
            }
        }
    }
}

fn lock(in_flight: &Mutex<InFlight>) -> MutexGuard<'_, InFlight> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
enum LoadKind {
    Initial,
    Refresh,
}

pub struct TodoListController<T> {
    store: TodoStore<T>,
    state: RwLock<ListState>,
    in_flight: Mutex<InFlight>,
    open: AtomicBool,
}

impl<T: Transport> TodoListController<T> {
    pub fn new(store: TodoStore<T>) -> Self {
        Self {
            store,
            state: RwLock::new(ListState::default()),
            in_flight: Mutex::new(InFlight::default()),
            open: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &TodoStore<T> {
        &self.store
    }

    /// Fetch the list and replace `items` wholesale.
    ///
    /// Shows the full loading state. Returns `true` when fresh items were
    /// applied; on failure the notice is set and `items` are kept.
    pub async fn initial_load(&self) -> bool {
        self.load(LoadKind::Initial).await
    }

    /// Like `initial_load`, but under the `refreshing` flag so the current
    /// items stay visible. A no-op returning `false` while another load is
    /// in flight. A response that predates a confirmed mutation is fetched
    /// again rather than applied.
    pub async fn refresh(&self) -> bool {
        self.load(LoadKind::Refresh).await
    }

    pub async fn add(&self, task: &str) -> Result<Todo, ControllerError> {
        self.ensure_open()?;
        let new = NewTodo::new(task)?;
        let _claim = self
            .claim(Slot::Add)
            .ok_or(ControllerError::AddInFlight)?;

        let created = self.store.create(&new).await?;
        self.reconcile(|items| {
            // A refresh that finished first may already hold the row.
            match items.iter().position(|todo| todo.id == created.id) {
                Some(pos) => items[pos] = created.clone(),
                None => items.insert(0, created.clone()),
            }
        })
        .await?;
        Ok(created)
    }

    pub async fn toggle(&self, id: &TodoId, completed: bool) -> Result<Todo, ControllerError> {
        self.ensure_open()?;
        let _claim = self.claim_item(id)?;

        let updated = self.store.toggle(id, completed).await?;
        self.reconcile(|items| {
            if let Some(todo) = items.iter_mut().find(|todo| &todo.id == id) {
                todo.completed = completed;
            }
        })
        .await?;
        Ok(updated)
    }

    /// Apply a partial update; only the fields present in `patch` change
    /// locally.
    pub async fn edit(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo, ControllerError> {
        self.ensure_open()?;
        let patch = patch.validated()?;
        let _claim = self.claim_item(id)?;

        let updated = self.store.update(id, &patch).await?;
        self.reconcile(|items| {
            if let Some(todo) = items.iter_mut().find(|todo| &todo.id == id) {
                patch.apply_to(todo);
            }
        })
        .await?;
        Ok(updated)
    }

    pub async fn remove(&self, id: &TodoId) -> Result<(), ControllerError> {
        self.ensure_open()?;
        let _claim = self.claim_item(id)?;

        self.store.delete(id).await?;
        self.reconcile(|items| items.retain(|todo| &todo.id != id))
            .await
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let state = self.state.read().await;
        ListSnapshot {
            items: state.items.clone(),
            loading: state.loading,
            refreshing: state.refreshing,
        }
    }

    pub async fn completed_count(&self) -> usize {
        let state = self.state.read().await;
        state.items.iter().filter(|todo| todo.completed).count()
    }

    pub async fn total_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// The pending load-failure notice, cleared once read.
    pub async fn take_notice(&self) -> Option<String> {
        self.state.write().await.notice.take()
    }

    /// Stop applying responses. Requests already sent still complete
    /// remotely; their callers get `ControllerError::Closed`.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn load(&self, kind: LoadKind) -> bool {
        if !self.is_open() {
            return false;
        }
        let Some(_claim) = self.claim(Slot::Load) else {
            debug!(?kind, "load already in flight");
            return false;
        };

        let mut started = self.begin_load(kind).await;
        let mut attempt = 1;
        loop {
            let result = self.store.list().await;

            let mut state = self.state.write().await;
            if !self.is_open() {
                state.settle(kind);
                warn!(?kind, "list closed during load, dropping result");
                return false;
            }
            match result {
                Ok(_) if state.generation != started && attempt < LOAD_ATTEMPTS => {
                    debug!(?kind, attempt, "list changed during load, fetching again");
                    started = state.generation;
                    attempt += 1;
                }
                Ok(_) if state.generation != started => {
                    state.settle(kind);
                    warn!(?kind, "list kept changing during load, keeping local items");
                    return false;
                }
                Ok(todos) => {
                    state.settle(kind);
                    debug!(?kind, count = todos.len(), "replaced todo list");
                    state.items = todos;
                    return true;
                }
                Err(e) => {
                    state.settle(kind);
                    error!(?kind, error = %e, "error loading todos");
                    state.notice = Some(LOAD_FAILED.to_string());
                    return false;
                }
            }
        }
    }

    /// Raise the flag for `kind` and return the generation the fetch starts from.
    async fn begin_load(&self, kind: LoadKind) -> u64 {
        let mut state = self.state.write().await;
        match kind {
            LoadKind::Initial => state.loading = true,
            LoadKind::Refresh => state.refreshing = true,
        }
        state.generation
    }

    async fn reconcile(&self, apply: impl FnOnce(&mut Vec<Todo>)) -> Result<(), ControllerError> {
        let mut state = self.state.write().await;
        if !self.is_open() {
            warn!("list closed while request was in flight, dropping response");
            return Err(ControllerError::Closed);
        }
        apply(&mut state.items);
        state.generation += 1;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ControllerError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ControllerError::Closed)
        }
    }

    fn claim_item(&self, id: &TodoId) -> Result<Claim<'_>, ControllerError> {
        self.claim(Slot::Item(id.clone()))
            .ok_or_else(|| ControllerError::ItemBusy(id.clone()))
    }

    fn claim(&self, slot: Slot) -> Option<Claim<'_>> {
        let mut in_flight = lock(&self.in_flight);
        let free = match &slot {
            Slot::Add => !std::mem::replace(&mut in_flight.adding, true),
            Slot::Load => !std::mem::replace(&mut in_flight.loading, true),
            Slot::Item(id) => in_flight.items.insert(id.clone()),
        };
        drop(in_flight);
        free.then(|| Claim {
            in_flight: &self.in_flight,
            slot,
        })
    }
}
