//! Path routing and category selection.
//!
//! Routes follow the board's URL layout: `/` lists every category,
//! `/:category` lists one category and `/:category/:post_id` shows a post.
//! Anything else redirects to `/`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::actions::{self, Action};
use crate::model::{Category, ALL_CATEGORIES};
use crate::store::State;

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Category(String),
    Post { category: String, post_id: String },
}

impl Route {
    /// Parses a path. Paths with more than two segments resolve to `Home`.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect();
        match segments.as_slice() {
            [] => Route::Home,
            [category] => Route::Category(category.clone()),
            [category, post_id] => Route::Post {
                category: category.clone(),
                post_id: post_id.clone(),
            },
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Category(category) => format!("/{}", encode(category)),
            Route::Post { category, post_id } => {
                format!("/{}/{}", encode(category), encode(post_id))
            }
        }
    }

    /// Category token the route implies; `/` implies the `all` sentinel.
    pub fn category_token(&self) -> &str {
        match self {
            Route::Home => ALL_CATEGORIES,
            Route::Category(category) | Route::Post { category, .. } => category,
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            Route::Post { post_id, .. } => Some(post_id),
            _ => None,
        }
    }

    pub fn for_category(token: &str) -> Route {
        if token == ALL_CATEGORIES {
            Route::Home
        } else {
            Route::Category(token.to_string())
        }
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Exact, case sensitive match against the sentinel or a known path.
pub fn is_valid_category(token: &str, categories: &[Category]) -> bool {
    token == ALL_CATEGORIES || categories.iter().any(|category| category.path == token)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Select(Action),
    Redirect(Route),
}

/// Reconciles the route's category token with the loaded category set.
///
/// The check only runs when the category collection has been replaced
/// since the last call, so a route stays untouched while categories are
/// still loading and repeated renders never cause redirect loops.
#[derive(Debug, Default)]
pub struct CategorySelector {
    seen_revision: u64,
}

impl CategorySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(&mut self, state: &State, route: &Route) -> Option<Reconciliation> {
        if state.categories_revision == self.seen_revision {
            return None;
        }
        self.seen_revision = state.categories_revision;
        if !state.categories_loaded() {
            return None;
        }

        let token = route.category_token();
        if state.view.selected_category == token {
            return None;
        }
        if is_valid_category(token, &state.categories) {
            tracing::debug!(category = token, "route category accepted");
            Some(Reconciliation::Select(actions::change_category(token)))
        } else {
            tracing::info!(category = token, "unknown category in route, redirecting");
            Some(Reconciliation::Redirect(Route::Home))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::reduce;

    fn categories() -> Vec<Category> {
        vec![
            Category {
                name: "Reactjs".into(),
                path: "reactjs".into(),
            },
            Category {
                name: "Redux".into(),
                path: "redux".into(),
            },
        ]
    }

    fn loaded(state: &State) -> State {
        reduce(state, Action::CategoriesReplaced(categories()))
    }

    #[test]
    fn parses_board_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/reactjs"), Route::Category("reactjs".into()));
        assert_eq!(Route::parse("/reactjs/"), Route::Category("reactjs".into()));
        assert_eq!(
            Route::parse("/redux/6ni6ok3ym7mf1p33lnez?x=1"),
            Route::Post {
                category: "redux".into(),
                post_id: "6ni6ok3ym7mf1p33lnez".into()
            }
        );
        assert_eq!(Route::parse("/a/b/c"), Route::Home);
    }

    #[test]
    fn path_round_trips_encoded_segments() {
        let route = Route::Category("web dev".into());
        assert_eq!(route.path(), "/web%20dev");
        assert_eq!(Route::parse(&route.path()), route);
        assert_eq!(Route::Home.category_token(), ALL_CATEGORIES);
        assert_eq!(Route::for_category(ALL_CATEGORIES), Route::Home);
    }

    #[test]
    fn token_validity_is_exact() {
        let cats = categories();
        assert!(is_valid_category("all", &cats));
        assert!(is_valid_category("reactjs", &cats));
        assert!(!is_valid_category("Reactjs", &cats));
        assert!(!is_valid_category("react", &cats));
        assert!(!is_valid_category("", &cats));
    }

    #[test]
    fn waits_for_categories_before_validating() {
        let mut selector = CategorySelector::new();
        let route = Route::parse("/nonexistent");
        assert_eq!(selector.reconcile(&State::default(), &route), None);
    }

    #[test]
    fn valid_token_selects_category() {
        let mut selector = CategorySelector::new();
        let state = loaded(&State::default());
        let route = Route::parse("/reactjs");
        assert_eq!(
            selector.reconcile(&state, &route),
            Some(Reconciliation::Select(Action::CategoryChanged(
                "reactjs".into()
            )))
        );
    }

    #[test]
    fn invalid_token_redirects_home() {
        let mut selector = CategorySelector::new();
        let state = loaded(&State::default());
        assert_eq!(
            selector.reconcile(&state, &Route::parse("/nonexistent")),
            Some(Reconciliation::Redirect(Route::Home))
        );
    }

    #[test]
    fn only_runs_when_categories_change() {
        let mut selector = CategorySelector::new();
        let state = loaded(&State::default());
        let route = Route::parse("/nonexistent");
        assert!(selector.reconcile(&state, &route).is_some());
        assert_eq!(selector.reconcile(&state, &route), None);

        let refreshed = loaded(&state);
        assert!(selector.reconcile(&refreshed, &route).is_some());
    }

    #[test]
    fn matching_selection_is_left_alone() {
        let mut selector = CategorySelector::new();
        let state = loaded(&State::default());
        assert_eq!(selector.reconcile(&state, &Route::Home), None);
    }
}
