use std::sync::Arc;

use parking_lot::Mutex;

use crate::api;
use crate::error::{GatewayError, RecordKind, Result};
use crate::model::{
    Category, Comment, CommentEdit, NewComment, NewPost, Post, PostEdit, VoteDirection,
};

pub trait CategoryService: Send + Sync {
    fn list_categories(&self) -> Result<Vec<Category>>;
}

pub trait PostService: Send + Sync {
    fn list_posts(&self) -> Result<Vec<Post>>;
    fn create_post(&self, post: &NewPost) -> Result<Post>;
    fn update_post(&self, id: &str, edit: &PostEdit) -> Result<Post>;
    fn delete_post(&self, id: &str) -> Result<Post>;
    fn vote_post(&self, id: &str, direction: VoteDirection) -> Result<Post>;
}

pub trait CommentService: Send + Sync {
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>>;
    fn create_comment(&self, comment: &NewComment) -> Result<Comment>;
    fn update_comment(&self, id: &str, edit: &CommentEdit) -> Result<Comment>;
    fn delete_comment(&self, id: &str) -> Result<Comment>;
    fn vote_comment(&self, id: &str, direction: VoteDirection) -> Result<Comment>;
}

/// The three gateway services the synchronizer talks to.
#[derive(Clone)]
pub struct Services {
    pub categories: Arc<dyn CategoryService>,
    pub posts: Arc<dyn PostService>,
    pub comments: Arc<dyn CommentService>,
}

impl Services {
    pub fn http(client: Arc<api::Client>) -> Self {
        Self {
            categories: Arc::new(HttpCategoryService::new(client.clone())),
            posts: Arc::new(HttpPostService::new(client.clone())),
            comments: Arc::new(HttpCommentService::new(client)),
        }
    }

    pub fn memory(board: Arc<MemoryBoard>) -> Self {
        Self {
            categories: board.clone(),
            posts: board.clone(),
            comments: board,
        }
    }
}

pub struct HttpCategoryService {
    client: Arc<api::Client>,
}

impl HttpCategoryService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CategoryService for HttpCategoryService {
    fn list_categories(&self) -> Result<Vec<Category>> {
        self.client.categories()
    }
}

pub struct HttpPostService {
    client: Arc<api::Client>,
}

impl HttpPostService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl PostService for HttpPostService {
    fn list_posts(&self) -> Result<Vec<Post>> {
        self.client.posts()
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.client.create_post(post)
    }

    fn update_post(&self, id: &str, edit: &PostEdit) -> Result<Post> {
        self.client.update_post(id, edit)
    }

    fn delete_post(&self, id: &str) -> Result<Post> {
        self.client.delete_post(id)
    }

    fn vote_post(&self, id: &str, direction: VoteDirection) -> Result<Post> {
        self.client.vote_post(id, direction)
    }
}

pub struct HttpCommentService {
    client: Arc<api::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.client.post_comments(post_id)
    }

    fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.client.create_comment(comment)
    }

    fn update_comment(&self, id: &str, edit: &CommentEdit) -> Result<Comment> {
        self.client.update_comment(id, edit)
    }

    fn delete_comment(&self, id: &str) -> Result<Comment> {
        self.client.delete_comment(id)
    }

    fn vote_comment(&self, id: &str, direction: VoteDirection) -> Result<Comment> {
        self.client.vote_comment(id, direction)
    }
}

#[derive(Debug, Default)]
struct BoardData {
    categories: Vec<Category>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

/// In-memory board with the server's semantics. Backs offline mode and tests.
#[derive(Debug, Default)]
pub struct MemoryBoard {
    data: Mutex<BoardData>,
}

impl MemoryBoard {
    pub fn new(categories: Vec<Category>, posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self {
            data: Mutex::new(BoardData {
                categories,
                posts,
                comments,
            }),
        }
    }

    /// Board seeded with the sample content the stock server ships with.
    pub fn sample() -> Self {
        let categories = vec![
            category("React", "react"),
            category("Redux", "redux"),
            category("Udacity", "udacity"),
        ];
        let posts = vec![
            Post {
                id: "8xf0y6ziyjabvozdd253nd".into(),
                timestamp: 1_467_166_872_634,
                title: "Udacity is the best place to learn React".into(),
                body: "Everyone says so after all.".into(),
                author: "thingtwo".into(),
                category: "react".into(),
                vote_score: 6,
                comment_count: 2,
                deleted: false,
            },
            Post {
                id: "6ni6ok3ym7mf1p33lnez".into(),
                timestamp: 1_468_479_767_190,
                title: "Learn Redux in 10 minutes!".into(),
                body: "Just kidding. It takes more than 10 minutes to learn technology.".into(),
                author: "thingone".into(),
                category: "redux".into(),
                vote_score: -5,
                comment_count: 0,
                deleted: false,
            },
        ];
        let comments = vec![
            Comment {
                id: "894tuq4ut84ut8v4t8wun89g".into(),
                parent_id: "8xf0y6ziyjabvozdd253nd".into(),
                timestamp: 1_468_166_872_634,
                body: "Hi there! I am a COMMENT.".into(),
                author: "thingtwo".into(),
                vote_score: 6,
                deleted: false,
                parent_deleted: false,
            },
            Comment {
                id: "8tu4bsun805n8un48ve89".into(),
                parent_id: "8xf0y6ziyjabvozdd253nd".into(),
                timestamp: 1_469_479_767_190,
                body: "Comments. Are. Cool.".into(),
                author: "thingone".into(),
                vote_score: -5,
                deleted: false,
                parent_deleted: false,
            },
        ];
        Self::new(categories, posts, comments)
    }
}

fn category(name: &str, path: &str) -> Category {
    Category {
        name: name.into(),
        path: path.into(),
    }
}

impl CategoryService for MemoryBoard {
    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.data.lock().categories.clone())
    }
}

impl PostService for MemoryBoard {
    fn list_posts(&self) -> Result<Vec<Post>> {
        let data = self.data.lock();
        Ok(data.posts.iter().filter(|p| !p.deleted).cloned().collect())
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        let mut data = self.data.lock();
        if data.posts.iter().any(|p| p.id == post.id) {
            return Err(GatewayError::Rejected(format!("post {} already exists", post.id)));
        }
        if !data.categories.iter().any(|c| c.path == post.category) {
            return Err(GatewayError::not_found(RecordKind::Category, &post.category));
        }
        let created = Post {
            id: post.id.clone(),
            timestamp: post.timestamp,
            title: post.title.clone(),
            body: post.body.clone(),
            author: post.author.clone(),
            category: post.category.clone(),
            vote_score: 1,
            comment_count: 0,
            deleted: false,
        };
        data.posts.push(created.clone());
        Ok(created)
    }

    fn update_post(&self, id: &str, edit: &PostEdit) -> Result<Post> {
        let mut data = self.data.lock();
        let post = live_post_mut(&mut data.posts, id)?;
        post.title = edit.title.clone();
        post.body = edit.body.clone();
        Ok(post.clone())
    }

    fn delete_post(&self, id: &str) -> Result<Post> {
        let mut data = self.data.lock();
        let post = live_post_mut(&mut data.posts, id)?;
        post.deleted = true;
        let deleted = post.clone();
        for comment in data.comments.iter_mut().filter(|c| c.parent_id == id) {
            comment.parent_deleted = true;
        }
        Ok(deleted)
    }

    fn vote_post(&self, id: &str, direction: VoteDirection) -> Result<Post> {
        let mut data = self.data.lock();
        let post = live_post_mut(&mut data.posts, id)?;
        post.vote_score = direction.apply(post.vote_score);
        Ok(post.clone())
    }
}

impl CommentService for MemoryBoard {
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let data = self.data.lock();
        Ok(data
            .comments
            .iter()
            .filter(|c| c.parent_id == post_id && !c.deleted && !c.parent_deleted)
            .cloned()
            .collect())
    }

    fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut data = self.data.lock();
        if data.comments.iter().any(|c| c.id == comment.id) {
            return Err(GatewayError::Rejected(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        let parent = live_post_mut(&mut data.posts, &comment.parent_id)?;
        parent.comment_count += 1;
        let created = Comment {
            id: comment.id.clone(),
            parent_id: comment.parent_id.clone(),
            timestamp: comment.timestamp,
            body: comment.body.clone(),
            author: comment.author.clone(),
            vote_score: 1,
            deleted: false,
            parent_deleted: false,
        };
        data.comments.push(created.clone());
        Ok(created)
    }

    fn update_comment(&self, id: &str, edit: &CommentEdit) -> Result<Comment> {
        let mut data = self.data.lock();
        let comment = live_comment_mut(&mut data.comments, id)?;
        comment.body = edit.body.clone();
        comment.timestamp = edit.timestamp;
        Ok(comment.clone())
    }

    fn delete_comment(&self, id: &str) -> Result<Comment> {
        let mut data = self.data.lock();
        let comment = live_comment_mut(&mut data.comments, id)?;
        comment.deleted = true;
        let deleted = comment.clone();
        if let Some(parent) = data.posts.iter_mut().find(|p| p.id == deleted.parent_id) {
            parent.comment_count = (parent.comment_count - 1).max(0);
        }
        Ok(deleted)
    }

    fn vote_comment(&self, id: &str, direction: VoteDirection) -> Result<Comment> {
        let mut data = self.data.lock();
        let comment = live_comment_mut(&mut data.comments, id)?;
        comment.vote_score = direction.apply(comment.vote_score);
        Ok(comment.clone())
    }
}

fn live_post_mut<'a>(posts: &'a mut [Post], id: &str) -> Result<&'a mut Post> {
    posts
        .iter_mut()
        .find(|p| p.id == id && !p.deleted)
        .ok_or_else(|| GatewayError::not_found(RecordKind::Post, id))
}

fn live_comment_mut<'a>(comments: &'a mut [Comment], id: &str) -> Result<&'a mut Comment> {
    comments
        .iter_mut()
        .find(|c| c.id == id && !c.deleted)
        .ok_or_else(|| GatewayError::not_found(RecordKind::Comment, id))
}
