//! Derived views over a [`State`] snapshot. Nothing here mutates the store.

use crate::model::{Comment, Post, SortOrder, Sortable, ALL_CATEGORIES};
use crate::store::State;

/// Posts in `category` (or every post for the `all` sentinel), highest
/// `order` key first. Equal keys keep their collection order.
pub fn visible_posts<'a>(posts: &'a [Post], category: &str, order: SortOrder) -> Vec<&'a Post> {
    let filtered = posts
        .iter()
        .filter(|post| !post.deleted)
        .filter(|post| category == ALL_CATEGORIES || post.category == category)
        .collect();
    sort_descending(filtered, order)
}

/// Comments attached to `post_id`, highest `order` key first.
pub fn post_comments<'a>(
    comments: &'a [Comment],
    post_id: &str,
    order: SortOrder,
) -> Vec<&'a Comment> {
    let filtered = comments
        .iter()
        .filter(|comment| !comment.deleted && comment.parent_id == post_id)
        .collect();
    sort_descending(filtered, order)
}

pub fn sort_descending<T: Sortable>(mut items: Vec<&T>, order: SortOrder) -> Vec<&T> {
    // sort_by_key is stable
    items.sort_by_key(|item| std::cmp::Reverse(item.sort_key(order)));
    items
}

pub fn selected_posts(state: &State) -> Vec<&Post> {
    visible_posts(
        &state.posts,
        &state.view.selected_category,
        state.view.sort_order,
    )
}

pub fn selected_post_comments<'a>(state: &'a State, post_id: &str) -> Vec<&'a Comment> {
    post_comments(&state.comments, post_id, state.view.sort_order)
}

/// Display name for a category token, falling back to the raw token.
pub fn category_label(state: &State, token: &str) -> String {
    if token == ALL_CATEGORIES {
        return "All".to_string();
    }
    state
        .category(token)
        .map(|category| category.name.clone())
        .unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, category: &str, score: i64, timestamp: i64) -> Post {
        Post {
            id: id.into(),
            timestamp,
            title: id.into(),
            body: String::new(),
            author: "a".into(),
            category: category.into(),
            vote_score: score,
            comment_count: 0,
            deleted: false,
        }
    }

    fn comment(id: &str, parent: &str, score: i64) -> Comment {
        Comment {
            id: id.into(),
            parent_id: parent.into(),
            timestamp: 0,
            body: String::new(),
            author: "a".into(),
            vote_score: score,
            deleted: false,
            parent_deleted: false,
        }
    }

    fn ids<T, F: Fn(&T) -> &str>(items: &[&T], key: F) -> Vec<String> {
        items.iter().map(|item| key(item).to_string()).collect()
    }

    #[test]
    fn filters_by_category_and_sorts_by_score() {
        let posts = vec![post("1", "reactjs", 3, 10), post("2", "funny", 5, 20)];
        let react = visible_posts(&posts, "reactjs", SortOrder::VoteScore);
        assert_eq!(ids(&react, |p| p.id.as_str()), ["1"]);

        let all = visible_posts(&posts, ALL_CATEGORIES, SortOrder::VoteScore);
        assert_eq!(ids(&all, |p| p.id.as_str()), ["2", "1"]);
    }

    #[test]
    fn sorts_by_timestamp_descending() {
        let posts = vec![
            post("old", "x", 9, 1),
            post("new", "x", 0, 3),
            post("mid", "x", 5, 2),
        ];
        let sorted = visible_posts(&posts, ALL_CATEGORIES, SortOrder::Timestamp);
        assert_eq!(ids(&sorted, |p| p.id.as_str()), ["new", "mid", "old"]);
    }

    #[test]
    fn equal_keys_keep_collection_order() {
        let posts = vec![
            post("a", "x", 1, 0),
            post("b", "x", 2, 0),
            post("c", "x", 1, 0),
            post("d", "x", 2, 0),
        ];
        let sorted = visible_posts(&posts, "x", SortOrder::VoteScore);
        assert_eq!(ids(&sorted, |p| p.id.as_str()), ["b", "d", "a", "c"]);
    }

    #[test]
    fn deleted_and_unknown_category_posts_are_hidden() {
        let mut gone = post("gone", "x", 1, 0);
        gone.deleted = true;
        let posts = vec![gone, post("kept", "x", 0, 0)];
        assert_eq!(
            ids(&visible_posts(&posts, "x", SortOrder::VoteScore), |p| p.id.as_str()),
            ["kept"]
        );
        assert!(visible_posts(&posts, "missing", SortOrder::VoteScore).is_empty());
    }

    #[test]
    fn comments_match_parent_exactly() {
        let comments = vec![
            comment("a", "1", 1),
            comment("b", "2", 8),
            comment("c", "1", 4),
            comment("d", "10", 3),
        ];
        let derived = post_comments(&comments, "1", SortOrder::VoteScore);
        assert_eq!(ids(&derived, |c| c.id.as_str()), ["c", "a"]);
        assert!(post_comments(&comments, "nope", SortOrder::VoteScore).is_empty());
    }

    #[test]
    fn category_label_prefers_name() {
        let mut state = State::default();
        state.categories = std::sync::Arc::new(vec![crate::model::Category {
            name: "Reactjs".into(),
            path: "reactjs".into(),
        }]);
        assert_eq!(category_label(&state, "reactjs"), "Reactjs");
        assert_eq!(category_label(&state, ALL_CATEGORIES), "All");
        assert_eq!(category_label(&state, "other"), "other");
    }
}
