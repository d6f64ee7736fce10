//! Everything that can change the store.
//!
//! Actions describe what happened, either a user intent (changing the
//! selected category) or a confirmed network result (a comment was created).
//! The reducer in `store.rs` is the only place that interprets them.

use std::fmt;

use crate::model::{Category, Comment, Post, SortOrder, VoteDirection};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CategoriesReplaced(Vec<Category>),
    PostsReplaced(Vec<Post>),
    PostAdded(Post),
    PostUpdated(Post),
    PostDeleted { id: String },
    PostVoted { id: String, direction: VoteDirection },
    CommentsReplacedForPost { post_id: String, comments: Vec<Comment> },
    CommentAdded(Comment),
    CommentUpdated(Comment),
    CommentRemoved { id: String },
    CommentVoted { id: String, direction: VoteDirection },
    CategoryChanged(String),
    SortOrderChanged(SortOrder),
    RequestFailed { operation: Operation, message: String },
    NoticeDismissed,
}

/// Gateway operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadCategories,
    LoadPosts,
    CreatePost,
    UpdatePost,
    DeletePost,
    VotePost,
    LoadComments,
    CreateComment,
    UpdateComment,
    DeleteComment,
    VoteComment,
}

impl Operation {
    pub fn describe(&self) -> &'static str {
        match self {
            Operation::LoadCategories => "load categories",
            Operation::LoadPosts => "load posts",
            Operation::CreatePost => "publish post",
            Operation::UpdatePost => "save post",
            Operation::DeletePost => "delete post",
            Operation::VotePost => "vote on post",
            Operation::LoadComments => "load comments",
            Operation::CreateComment => "publish comment",
            Operation::UpdateComment => "save comment",
            Operation::DeleteComment => "delete comment",
            Operation::VoteComment => "vote on comment",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

pub fn replace_categories(categories: Vec<Category>) -> Action {
    Action::CategoriesReplaced(categories)
}

pub fn replace_posts(posts: Vec<Post>) -> Action {
    Action::PostsReplaced(posts)
}

pub fn change_category(token: impl Into<String>) -> Action {
    Action::CategoryChanged(token.into())
}

pub fn change_sort_order(order: SortOrder) -> Action {
    Action::SortOrderChanged(order)
}

pub fn request_failed(operation: Operation, err: impl fmt::Display) -> Action {
    Action::RequestFailed {
        operation,
        message: err.to_string(),
    }
}
