use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Sentinel category token meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub vote_score: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub deleted: bool,
}

impl Post {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub vote_score: i64,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub parent_deleted: bool,
}

impl Comment {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.timestamp)
    }
}

/// Payload sent when creating a post. The id is generated client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub id: String,
    pub timestamp: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub category: String,
}

impl NewPost {
    pub fn new(title: &str, body: &str, author: &str, category: &str) -> Self {
        Self {
            id: new_record_id(),
            timestamp: now_millis(),
            title: title.trim().to_string(),
            body: body.trim().to_string(),
            author: author.trim().to_string(),
            category: category.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEdit {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub id: String,
    pub timestamp: i64,
    pub body: String,
    pub author: String,
    pub parent_id: String,
}

impl NewComment {
    pub fn new(parent_id: &str, body: &str, author: &str) -> Self {
        Self {
            id: new_record_id(),
            timestamp: now_millis(),
            body: body.trim().to_string(),
            author: author.trim().to_string(),
            parent_id: parent_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEdit {
    pub timestamp: i64,
    pub body: String,
}

impl CommentEdit {
    pub fn new(body: &str) -> Self {
        Self {
            timestamp: now_millis(),
            body: body.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    #[serde(rename = "upVote")]
    Up,
    #[serde(rename = "downVote")]
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "upVote",
            VoteDirection::Down => "downVote",
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn apply(&self, score: i64) -> i64 {
        score.saturating_add(self.delta())
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteRequest {
    pub option: VoteDirection,
}

/// Field used to order posts and comments, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "voteScore")]
    VoteScore,
    #[serde(rename = "timestamp")]
    Timestamp,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [SortOrder::VoteScore, SortOrder::Timestamp];

    pub fn field_name(&self) -> &'static str {
        match self {
            SortOrder::VoteScore => "voteScore",
            SortOrder::Timestamp => "timestamp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::VoteScore => "Top voted",
            SortOrder::Timestamp => "Newest",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortOrder::VoteScore => SortOrder::Timestamp,
            SortOrder::Timestamp => SortOrder::VoteScore,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "voteScore" | "votescore" | "votes" => Ok(SortOrder::VoteScore),
            "timestamp" | "time" | "new" => Ok(SortOrder::Timestamp),
            other => Err(format!(
                "unknown sort order '{other}' (expected voteScore or timestamp)"
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Records that can be ordered by a [`SortOrder`].
pub trait Sortable {
    fn sort_key(&self, order: SortOrder) -> i64;
}

impl Sortable for Post {
    fn sort_key(&self, order: SortOrder) -> i64 {
        match order {
            SortOrder::VoteScore => self.vote_score,
            SortOrder::Timestamp => self.timestamp,
        }
    }
}

impl Sortable for Comment {
    fn sort_key(&self, order: SortOrder) -> i64 {
        match order {
            SortOrder::VoteScore => self.vote_score,
            SortOrder::Timestamp => self.timestamp,
        }
    }
}

pub fn new_record_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn timestamp_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

pub fn format_timestamp(millis: i64) -> String {
    match timestamp_to_datetime(millis) {
        Some(at) => at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        None => "unknown date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_deserializes_server_shape() {
        let raw = r#"{
            "id": "8xf0y6ziyjabvozdd253nd",
            "timestamp": 1467166872634,
            "title": "Udacity is the best place to learn React",
            "body": "Everyone says so after all.",
            "author": "thingtwo",
            "category": "react",
            "voteScore": 6,
            "deleted": false,
            "commentCount": 2
        }"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.category, "react");
        assert_eq!(post.vote_score, 6);
        assert_eq!(post.comment_count, 2);
        assert!(post.created_at().is_some());
    }

    #[test]
    fn comment_uses_camel_case_parent_id() {
        let raw = r#"{"id":"c1","parentId":"p1","voteScore":-2,"parentDeleted":true}"#;
        let comment: Comment = serde_json::from_str(raw).unwrap();
        assert_eq!(comment.parent_id, "p1");
        assert_eq!(comment.vote_score, -2);
        assert!(comment.parent_deleted);
        assert!(comment.created_at().is_none());
    }

    #[test]
    fn vote_request_serializes_option() {
        let body = serde_json::to_string(&VoteRequest {
            option: VoteDirection::Down,
        })
        .unwrap();
        assert_eq!(body, r#"{"option":"downVote"}"#);
    }

    #[test]
    fn vote_saturates_at_bounds() {
        assert_eq!(VoteDirection::Up.apply(i64::MAX), i64::MAX);
        assert_eq!(VoteDirection::Down.apply(i64::MIN), i64::MIN);
        assert_eq!(VoteDirection::Down.apply(VoteDirection::Up.apply(4)), 4);
    }

    #[test]
    fn sort_order_parses_field_names() {
        assert_eq!("voteScore".parse::<SortOrder>(), Ok(SortOrder::VoteScore));
        assert_eq!("timestamp".parse::<SortOrder>(), Ok(SortOrder::Timestamp));
        assert!("title".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::VoteScore.next(), SortOrder::Timestamp);
    }

    #[test]
    fn new_comment_trims_input_and_generates_id() {
        let draft = NewComment::new("p1", "  hello  ", " ana ");
        assert_eq!(draft.body, "hello");
        assert_eq!(draft.author, "ana");
        assert_eq!(draft.id.len(), 24);
        assert_ne!(draft.id, NewComment::new("p1", "x", "y").id);
    }
}
