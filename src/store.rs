use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::actions::{Action, Operation};
use crate::model::{Category, Comment, Post, SortOrder, ALL_CATEGORIES};

/// Snapshot of everything the views read.
#[derive(Debug, Clone)]
pub struct State {
    pub categories: Arc<Vec<Category>>,
    /// Bumped on every category replacement, even with identical contents.
    pub categories_revision: u64,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub view: ViewSelection,
    pub notice: Option<Notice>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            categories: Arc::new(Vec::new()),
            categories_revision: 0,
            posts: Vec::new(),
            comments: Vec::new(),
            view: ViewSelection::default(),
            notice: None,
        }
    }
}

impl State {
    pub fn with_sort_order(sort_order: SortOrder) -> Self {
        Self {
            view: ViewSelection {
                sort_order,
                ..ViewSelection::default()
            },
            ..Self::default()
        }
    }

    pub fn categories_loaded(&self) -> bool {
        self.categories_revision > 0
    }

    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }

    pub fn category(&self, path: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSelection {
    pub selected_category: String,
    pub sort_order: SortOrder,
}

impl Default for ViewSelection {
    fn default() -> Self {
        Self {
            selected_category: ALL_CATEGORIES.to_string(),
            sort_order: SortOrder::default(),
        }
    }
}

/// User visible failure raised by a [`Action::RequestFailed`].
#[derive(Debug, Clone)]
pub struct Notice {
    pub operation: Operation,
    pub message: String,
    pub raised_at: Instant,
}

impl Notice {
    pub fn text(&self) -> String {
        format!("Could not {}: {}", self.operation, self.message)
    }

    pub fn expired(&self, ttl: Duration) -> bool {
        self.raised_at.elapsed() >= ttl
    }
}

/// Applies one action to a state and returns the next state.
pub fn reduce(state: &State, action: Action) -> State {
    let mut next = state.clone();
    match action {
        Action::CategoriesReplaced(categories) => {
            next.categories = Arc::new(categories);
            next.categories_revision = state.categories_revision.wrapping_add(1).max(1);
        }
        Action::PostsReplaced(posts) => {
            next.posts = posts;
        }
        Action::PostAdded(post) | Action::PostUpdated(post) => {
            upsert(&mut next.posts, post, |p| p.id.as_str());
        }
        Action::PostDeleted { id } => {
            next.posts.retain(|post| post.id != id);
            next.comments.retain(|comment| comment.parent_id != id);
        }
        Action::PostVoted { id, direction } => {
            if let Some(post) = next.posts.iter_mut().find(|post| post.id == id) {
                post.vote_score = direction.apply(post.vote_score);
            }
        }
        Action::CommentsReplacedForPost { post_id, comments } => {
            next.comments.retain(|comment| comment.parent_id != post_id);
            next.comments.extend(
                comments
                    .into_iter()
                    .filter(|comment| comment.parent_id == post_id),
            );
        }
        Action::CommentAdded(comment) => {
            let is_new = !next.comments.iter().any(|c| c.id == comment.id);
            if is_new {
                adjust_comment_count(&mut next.posts, &comment.parent_id, 1);
            }
            upsert(&mut next.comments, comment, |c| c.id.as_str());
        }
        Action::CommentUpdated(comment) => {
            upsert(&mut next.comments, comment, |c| c.id.as_str());
        }
        Action::CommentRemoved { id } => {
            if let Some(index) = next.comments.iter().position(|c| c.id == id) {
                let removed = next.comments.remove(index);
                adjust_comment_count(&mut next.posts, &removed.parent_id, -1);
            }
        }
        Action::CommentVoted { id, direction } => {
            if let Some(comment) = next.comments.iter_mut().find(|c| c.id == id) {
                comment.vote_score = direction.apply(comment.vote_score);
            }
        }
        Action::CategoryChanged(token) => {
            next.view.selected_category = token;
        }
        Action::SortOrderChanged(order) => {
            next.view.sort_order = order;
        }
        Action::RequestFailed { operation, message } => {
            next.notice = Some(Notice {
                operation,
                message,
                raised_at: Instant::now(),
            });
        }
        Action::NoticeDismissed => {
            next.notice = None;
        }
    }
    next
}

fn upsert<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &str) {
    match items.iter().position(|existing| key(existing) == key(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

fn adjust_comment_count(posts: &mut [Post], post_id: &str, delta: i64) {
    if let Some(post) = posts.iter_mut().find(|post| post.id == post_id) {
        post.comment_count = post.comment_count.saturating_add(delta).max(0);
    }
}

/// State container: one read path, one write path, and change notification.
pub struct Store {
    state: Arc<State>,
    subscribers: Vec<Sender<Arc<State>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::default())
    }
}

impl Store {
    pub fn new(initial: State) -> Self {
        Self {
            state: Arc::new(initial),
            subscribers: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    pub fn dispatch(&mut self, action: Action) -> Arc<State> {
        tracing::trace!(?action, "dispatch");
        self.state = Arc::new(reduce(&self.state, action));
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    /// Every dispatch after this call is delivered to the returned receiver.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<Arc<State>> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }
}
