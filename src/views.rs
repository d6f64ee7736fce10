//! View-side effects with explicit dependencies.

use crate::model::{Comment, Post};
use crate::selectors;
use crate::store::State;

/// What a view needs done after it observed a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchComments { post_id: String },
}

/// Detail view for one post.
///
/// Comments are (re)fetched on mount and whenever the size of the post
/// collection changes, which is the signal that a post fetch landed.
#[derive(Debug, Clone)]
pub struct PostDetail {
    target_id: String,
    seen_post_count: Option<usize>,
    current: Option<Post>,
}

impl PostDetail {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            seen_post_count: None,
            current: None,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn mount(&mut self, state: &State) -> Option<Effect> {
        self.seen_post_count = Some(state.posts.len());
        self.refresh(state)
    }

    pub fn update(&mut self, state: &State) -> Option<Effect> {
        let count = state.posts.len();
        if self.seen_post_count == Some(count) {
            return None;
        }
        self.seen_post_count = Some(count);
        self.refresh(state)
    }

    fn refresh(&mut self, state: &State) -> Option<Effect> {
        let post = state.post(&self.target_id)?;
        self.current = Some(post.clone());
        Some(Effect::FetchComments {
            post_id: self.target_id.clone(),
        })
    }

    /// Post to render. Prefers the live record so votes and edits show up,
    /// and keeps the last known copy while the collection is refreshing.
    pub fn post<'a>(&'a self, state: &'a State) -> Option<&'a Post> {
        state.post(&self.target_id).or(self.current.as_ref())
    }

    pub fn is_not_found(&self, state: &State) -> bool {
        self.post(state).is_none()
    }

    pub fn comments<'a>(&self, state: &'a State) -> Vec<&'a Comment> {
        selectors::selected_post_comments(state, &self.target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::store::reduce;

    fn post(id: &str) -> Post {
        Post {
            id: id.into(),
            timestamp: 0,
            title: id.into(),
            body: String::new(),
            author: "a".into(),
            category: "react".into(),
            vote_score: 0,
            comment_count: 0,
            deleted: false,
        }
    }

    fn fetch(id: &str) -> Option<Effect> {
        Some(Effect::FetchComments {
            post_id: id.to_string(),
        })
    }

    #[test]
    fn mount_fetches_when_post_known() {
        let state = reduce(&State::default(), Action::PostsReplaced(vec![post("1")]));
        let mut detail = PostDetail::new("1");
        assert_eq!(detail.mount(&state), fetch("1"));
        assert!(!detail.is_not_found(&state));
    }

    #[test]
    fn fetch_waits_for_posts_to_arrive() {
        let empty = State::default();
        let mut detail = PostDetail::new("1");
        assert_eq!(detail.mount(&empty), None);
        assert!(detail.is_not_found(&empty));

        let loaded = reduce(&empty, Action::PostsReplaced(vec![post("1"), post("2")]));
        assert_eq!(detail.update(&loaded), fetch("1"));
        assert_eq!(detail.update(&loaded), None);
    }

    #[test]
    fn unknown_post_renders_not_found() {
        let state = reduce(&State::default(), Action::PostsReplaced(vec![post("1")]));
        let mut detail = PostDetail::new("missing");
        assert_eq!(detail.mount(&state), None);
        assert!(detail.is_not_found(&state));
        assert!(detail.comments(&state).is_empty());
    }

    #[test]
    fn same_size_refresh_does_not_refetch() {
        let state = reduce(&State::default(), Action::PostsReplaced(vec![post("1")]));
        let mut detail = PostDetail::new("1");
        detail.mount(&state);
        let mut voted = post("1");
        voted.vote_score = 10;
        let next = reduce(&state, Action::PostsReplaced(vec![voted]));
        assert_eq!(detail.update(&next), None);
        assert_eq!(detail.post(&next).map(|p| p.vote_score), Some(10));
    }

    #[test]
    fn keeps_last_known_post_when_it_disappears() {
        let state = reduce(&State::default(), Action::PostsReplaced(vec![post("1")]));
        let mut detail = PostDetail::new("1");
        detail.mount(&state);
        let emptied = reduce(&state, Action::PostsReplaced(vec![]));
        assert_eq!(detail.update(&emptied), None);
        assert_eq!(detail.post(&emptied).map(|p| p.id.as_str()), Some("1"));
    }
}
