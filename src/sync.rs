//! Bridges gateway calls and the store.
//!
//! Every call runs on a worker thread and reports back over a channel. The
//! UI loop drains completions with [`Synchronizer::poll`], which turns them
//! into store dispatches. Reads are grouped in slots where only the most
//! recent request may land; writes always land. A write that completes
//! while a read of a slot it touches is still running reissues that read,
//! so a listing taken before the write cannot overwrite its result.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::actions::{self, Action, Operation};
use crate::data::Services;
use crate::error::GatewayError;
use crate::model::{Comment, CommentEdit, NewComment, NewPost, Post, PostEdit, VoteDirection};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Categories,
    Posts,
    Comments { post_id: String },
}

impl Slot {
    fn comments(post_id: &str) -> Self {
        Slot::Comments {
            post_id: post_id.to_string(),
        }
    }
}

struct Completion {
    request_id: u64,
    slot: Option<Slot>,
    touches: Vec<Slot>,
    operation: Operation,
    result: Result<Action, GatewayError>,
}

pub struct Synchronizer {
    services: Services,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_request_id: u64,
    latest: HashMap<Slot, u64>,
    in_flight: usize,
}

impl Synchronizer {
    pub fn new(services: Services) -> Self {
        let (tx, rx) = unbounded();
        Self {
            services,
            tx,
            rx,
            next_request_id: 1,
            latest: HashMap::new(),
            in_flight: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_loading(&self, slot: &Slot) -> bool {
        self.latest.contains_key(slot)
    }

    pub fn refresh_categories(&mut self) {
        let service = self.services.categories.clone();
        self.read(Slot::Categories, Operation::LoadCategories, move || {
            service.list_categories().map(actions::replace_categories)
        });
    }

    pub fn refresh_posts(&mut self) {
        let service = self.services.posts.clone();
        self.read(Slot::Posts, Operation::LoadPosts, move || {
            service.list_posts().map(actions::replace_posts)
        });
    }

    pub fn fetch_comments(&mut self, post_id: &str) {
        let service = self.services.comments.clone();
        let slot = Slot::comments(post_id);
        let post_id = post_id.to_string();
        self.read(slot, Operation::LoadComments, move || {
            service
                .list_comments(&post_id)
                .map(|comments| Action::CommentsReplacedForPost { post_id, comments })
        });
    }

    pub fn create_post(&mut self, post: NewPost) {
        let service = self.services.posts.clone();
        self.write(vec![Slot::Posts], Operation::CreatePost, move || {
            service.create_post(&post).map(Action::PostAdded)
        });
    }

    pub fn update_post(&mut self, id: &str, edit: PostEdit) {
        let service = self.services.posts.clone();
        let id = id.to_string();
        self.write(vec![Slot::Posts], Operation::UpdatePost, move || {
            service.update_post(&id, &edit).map(Action::PostUpdated)
        });
    }

    pub fn delete_post(&mut self, post: &Post) {
        let service = self.services.posts.clone();
        let id = post.id.clone();
        let touches = vec![Slot::Posts, Slot::comments(&id)];
        self.write(touches, Operation::DeletePost, move || {
            service
                .delete_post(&id)
                .map(|_| Action::PostDeleted { id })
        });
    }

    pub fn vote_post(&mut self, post: &Post, direction: VoteDirection) {
        let service = self.services.posts.clone();
        let id = post.id.clone();
        self.write(vec![Slot::Posts], Operation::VotePost, move || {
            service
                .vote_post(&id, direction)
                .map(|_| Action::PostVoted { id, direction })
        });
    }

    pub fn create_comment(&mut self, comment: NewComment) {
        let service = self.services.comments.clone();
        let touches = vec![Slot::comments(&comment.parent_id), Slot::Posts];
        self.write(touches, Operation::CreateComment, move || {
            service.create_comment(&comment).map(Action::CommentAdded)
        });
    }

    pub fn update_comment(&mut self, original: &Comment, edit: CommentEdit) {
        let service = self.services.comments.clone();
        let id = original.id.clone();
        let touches = vec![Slot::comments(&original.parent_id)];
        self.write(touches, Operation::UpdateComment, move || {
            service.update_comment(&id, &edit).map(Action::CommentUpdated)
        });
    }

    pub fn remove_comment(&mut self, comment: &Comment) {
        let service = self.services.comments.clone();
        let id = comment.id.clone();
        let touches = vec![Slot::comments(&comment.parent_id), Slot::Posts];
        self.write(touches, Operation::DeleteComment, move || {
            service
                .delete_comment(&id)
                .map(|_| Action::CommentRemoved { id })
        });
    }

    pub fn vote_comment(&mut self, comment: &Comment, direction: VoteDirection) {
        let service = self.services.comments.clone();
        let id = comment.id.clone();
        let touches = vec![Slot::comments(&comment.parent_id)];
        self.write(touches, Operation::VoteComment, move || {
            service
                .vote_comment(&id, direction)
                .map(|_| Action::CommentVoted { id, direction })
        });
    }

    /// Applies every completion that has already arrived. Returns whether
    /// the store changed.
    pub fn poll(&mut self, store: &mut Store) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(store, completion);
        }
        changed
    }

    /// Blocks until nothing is in flight or `timeout` elapses, applying
    /// completions as they arrive. Returns the number of requests still
    /// outstanding.
    pub fn settle(&mut self, store: &mut Store, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply(store, completion);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.in_flight
    }

    fn reload(&mut self, slot: Slot) {
        match slot {
            Slot::Categories => self.refresh_categories(),
            Slot::Posts => self.refresh_posts(),
            Slot::Comments { post_id } => self.fetch_comments(&post_id),
        }
    }

    fn read<F>(&mut self, slot: Slot, operation: Operation, call: F)
    where
        F: FnOnce() -> Result<Action, GatewayError> + Send + 'static,
    {
        self.spawn(Some(slot), Vec::new(), operation, call);
    }

    fn write<F>(&mut self, touches: Vec<Slot>, operation: Operation, call: F)
    where
        F: FnOnce() -> Result<Action, GatewayError> + Send + 'static,
    {
        self.spawn(None, touches, operation, call);
    }

    fn spawn<F>(&mut self, slot: Option<Slot>, touches: Vec<Slot>, operation: Operation, call: F)
    where
        F: FnOnce() -> Result<Action, GatewayError> + Send + 'static,
    {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        if let Some(slot) = slot.clone() {
            self.latest.insert(slot, request_id);
        }
        self.in_flight += 1;
        tracing::debug!(request_id, %operation, "gateway call started");

        let tx = self.tx.clone();
        thread::spawn(move || {
            // a panicking service still reports, otherwise in_flight never drops
            let result = panic::catch_unwind(AssertUnwindSafe(call))
                .unwrap_or_else(|payload| Err(GatewayError::Worker(panic_message(&*payload))));
            let _ = tx.send(Completion {
                request_id,
                slot,
                touches,
                operation,
                result,
            });
        });
    }

    fn apply(&mut self, store: &mut Store, completion: Completion) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Completion {
            request_id,
            slot,
            touches,
            operation,
            result,
        } = completion;

        if let Some(slot) = slot {
            if self.latest.get(&slot) != Some(&request_id) {
                tracing::debug!(request_id, ?slot, "discarding superseded response");
                return false;
            }
            self.latest.remove(&slot);
        }

        match result {
            Ok(action) => {
                tracing::debug!(request_id, %operation, "gateway call finished");
                store.dispatch(action);
            }
            Err(err) => {
                tracing::warn!(request_id, %operation, error = %err, "gateway call failed");
                store.dispatch(actions::request_failed(operation, &err));
            }
        }

        for slot in touches {
            if self.latest.contains_key(&slot) {
                tracing::debug!(request_id, ?slot, "write landed during a read, reloading");
                self.reload(slot);
            }
        }
        true
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
