use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::actions::{self, Action};
use crate::modal::{
    CommentEditor, CommentField, CommentSubmission, DeleteTarget, DeletionConfirm, PostEditor,
    PostSubmission, TextInput,
};
use crate::model::{format_timestamp, Comment, Post, VoteDirection, ALL_CATEGORIES};
use crate::router::{CategorySelector, Reconciliation, Route};
use crate::selectors;
use crate::store::{State, Store};
use crate::sync::{Slot, Synchronizer};
use crate::views::{Effect, PostDetail};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pane {
    Categories,
    Posts,
    Detail,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Categories => "Categories",
            Pane::Posts => "Posts",
            Pane::Detail => "Post",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Categories => Pane::Posts,
            Pane::Posts | Pane::Detail => Pane::Detail,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Categories | Pane::Posts => Pane::Categories,
            Pane::Detail => Pane::Posts,
        }
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self, tick_rate: Duration) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= tick_rate {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Options {
    pub store: Store,
    pub sync: Synchronizer,
    pub route: Route,
    pub author: String,
    pub notice_ttl: Duration,
    pub tick_rate: Duration,
    pub status_message: String,
}

pub struct Model {
    store: Store,
    updates: Receiver<Arc<State>>,
    state: Arc<State>,
    sync: Synchronizer,
    route: Route,
    selector: CategorySelector,
    detail: Option<PostDetail>,

    focused_pane: Pane,
    nav_index: usize,
    post_index: usize,
    // 0 is the post itself, comments follow
    detail_index: usize,

    comment_editor: CommentEditor,
    post_editor: PostEditor,
    deletion: DeletionConfirm,
    goto: Option<TextInput>,

    author: String,
    notice_ttl: Duration,
    tick_rate: Duration,
    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let Options {
            mut store,
            sync,
            route,
            author,
            notice_ttl,
            tick_rate,
            status_message,
        } = options;
        let updates = store.subscribe();
        let state = store.snapshot();

        let mut model = Self {
            store,
            updates,
            state,
            sync,
            route: Route::Home,
            selector: CategorySelector::new(),
            detail: None,
            focused_pane: Pane::Posts,
            nav_index: 0,
            post_index: 0,
            detail_index: 0,
            comment_editor: CommentEditor::default(),
            post_editor: PostEditor::default(),
            deletion: DeletionConfirm::default(),
            goto: None,
            author,
            notice_ttl,
            tick_rate,
            status_message,
            spinner: Spinner::new(),
            needs_redraw: true,
        };
        model.navigate(route);
        model
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = self.tick_rate;

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.sync.is_busy() {
                    if self.spinner.advance(tick_rate) {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
                if self.expire_notice() {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Applies finished gateway calls, then lets the route and the detail
    /// view react to the new snapshot.
    fn poll_async(&mut self) -> bool {
        let polled = self.sync.poll(&mut self.store);
        let observed = self.observe_state();
        polled || observed
    }

    fn observe_state(&mut self) -> bool {
        let Some(latest) = self.updates.try_iter().last() else {
            return false;
        };
        self.state = latest;

        let state = Arc::clone(&self.state);
        match self.selector.reconcile(&state, &self.route) {
            Some(Reconciliation::Select(action)) => {
                self.store.dispatch(action);
            }
            Some(Reconciliation::Redirect(route)) => {
                self.status_message = format!(
                    "No category named '{}', showing everything.",
                    self.route.category_token()
                );
                self.route = route;
                self.detail = None;
                self.focused_pane = Pane::Posts;
                self.store.dispatch(actions::change_category(ALL_CATEGORIES));
            }
            None => {}
        }

        if let Some(detail) = self.detail.as_mut() {
            if let Some(Effect::FetchComments { post_id }) = detail.update(&state) {
                self.sync.fetch_comments(&post_id);
            }
        }

        // pick up whatever the reconciliation dispatched
        if let Some(latest) = self.updates.try_iter().last() {
            self.state = latest;
        }
        self.clamp_selection();
        true
    }

    fn expire_notice(&mut self) -> bool {
        let expired = self
            .state
            .notice
            .as_ref()
            .is_some_and(|notice| notice.expired(self.notice_ttl));
        if expired {
            self.store.dispatch(Action::NoticeDismissed);
            self.observe_state();
        }
        expired
    }

    /// Moves to `route` and reloads what it shows. Category tokens are
    /// checked once the refreshed categories land.
    pub fn navigate(&mut self, route: Route) {
        tracing::debug!(path = %route.path(), "navigate");
        self.route = route;
        self.sync.refresh_categories();
        self.sync.refresh_posts();

        match self.route.post_id() {
            Some(post_id) => {
                let mut detail = PostDetail::new(post_id);
                if let Some(Effect::FetchComments { post_id }) = detail.mount(&self.state) {
                    self.sync.fetch_comments(&post_id);
                }
                self.detail = Some(detail);
                self.detail_index = 0;
                self.focused_pane = Pane::Detail;
            }
            None => {
                self.detail = None;
                self.post_index = 0;
                if self.focused_pane == Pane::Detail {
                    self.focused_pane = Pane::Posts;
                }
            }
        }
        self.mark_dirty();
    }

    fn refresh(&mut self) {
        self.sync.refresh_categories();
        self.sync.refresh_posts();
        if let Some(detail) = self.detail.as_ref() {
            self.sync.fetch_comments(detail.target_id());
        }
        self.status_message = "Refreshing…".to_string();
    }

    fn category_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![(ALL_CATEGORIES.to_string(), "All".to_string())];
        entries.extend(
            self.state
                .categories
                .iter()
                .map(|category| (category.path.clone(), category.name.clone())),
        );
        entries
    }

    fn visible_posts(&self) -> Vec<&Post> {
        selectors::selected_posts(&self.state)
    }

    fn selected_post(&self) -> Option<&Post> {
        self.visible_posts().get(self.post_index).copied()
    }

    fn detail_post(&self) -> Option<&Post> {
        self.detail.as_ref().and_then(|detail| detail.post(&self.state))
    }

    fn detail_comments(&self) -> Vec<&Comment> {
        self.detail
            .as_ref()
            .map(|detail| detail.comments(&self.state))
            .unwrap_or_default()
    }

    fn selected_comment(&self) -> Option<&Comment> {
        let index = self.detail_index.checked_sub(1)?;
        self.detail_comments().get(index).copied()
    }

    fn clamp_selection(&mut self) {
        let categories = self.category_entries().len();
        self.nav_index = self.nav_index.min(categories.saturating_sub(1));
        let posts = self.visible_posts().len();
        self.post_index = self.post_index.min(posts.saturating_sub(1));
        let comments = self.detail_comments().len();
        self.detail_index = self.detail_index.min(comments);
    }

    fn move_selection(&mut self, down: bool) {
        let len = match self.focused_pane {
            Pane::Categories => self.category_entries().len(),
            Pane::Posts => self.visible_posts().len(),
            Pane::Detail => self.detail_comments().len() + 1,
        };
        let index = match self.focused_pane {
            Pane::Categories => &mut self.nav_index,
            Pane::Posts => &mut self.post_index,
            Pane::Detail => &mut self.detail_index,
        };
        if len == 0 {
            return;
        }
        *index = if down {
            (*index + 1).min(len - 1)
        } else {
            index.saturating_sub(1)
        };
    }

    /// Target of post actions: the open post in the detail pane, otherwise
    /// the highlighted one in the list.
    fn action_post(&self) -> Option<Post> {
        match self.focused_pane {
            Pane::Detail => self.detail_post().cloned(),
            _ => self.selected_post().cloned(),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        self.mark_dirty();
        if self.deletion.is_open() {
            self.handle_deletion_key(code);
            return Ok(false);
        }
        if self.comment_editor.is_open() {
            self.handle_comment_editor_key(code);
            return Ok(false);
        }
        if self.post_editor.is_open() {
            self.handle_post_editor_key(code);
            return Ok(false);
        }
        if self.goto.is_some() {
            self.handle_goto_key(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
            KeyCode::Char('h') | KeyCode::Left => {
                self.focused_pane = self.focused_pane.previous();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.focused_pane != Pane::Posts || self.detail.is_some() {
                    self.focused_pane = self.focused_pane.next();
                }
            }
            KeyCode::Enter => self.open_selection(),
            KeyCode::Esc | KeyCode::Backspace => {
                if self.detail.is_some() {
                    let token = self.route.category_token().to_string();
                    self.navigate(Route::for_category(&token));
                }
            }
            KeyCode::Char('s') => {
                let order = self.state.view.sort_order.next();
                self.store.dispatch(actions::change_sort_order(order));
                self.observe_state();
                self.status_message = format!("Sorted by {}.", order.label().to_lowercase());
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('g') => {
                self.goto = Some(TextInput::with_value(self.route.path()));
            }
            KeyCode::Char('n') => {
                let selected = self.state.view.selected_category.clone();
                let category = if selected == ALL_CATEGORIES {
                    String::new()
                } else {
                    selected
                };
                self.post_editor.open_new(&category, &self.author);
            }
            KeyCode::Char('a') => match self.detail_post().map(|post| post.id.clone()) {
                Some(post_id) => self.comment_editor.open_new(&post_id, &self.author),
                None => {
                    self.status_message = "Open a post to comment on it.".to_string();
                }
            },
            KeyCode::Char('e') => self.open_editor(),
            KeyCode::Char('x') => self.open_deletion(),
            KeyCode::Char('u') => self.vote(VoteDirection::Up),
            KeyCode::Char('d') => self.vote(VoteDirection::Down),
            _ => {}
        }
        Ok(false)
    }

    fn open_selection(&mut self) {
        match self.focused_pane {
            Pane::Categories => {
                if let Some((token, _)) = self.category_entries().get(self.nav_index).cloned() {
                    self.focused_pane = Pane::Posts;
                    self.navigate(Route::for_category(&token));
                }
            }
            Pane::Posts => {
                if let Some(post) = self.selected_post().cloned() {
                    self.navigate(Route::Post {
                        category: post.category,
                        post_id: post.id,
                    });
                }
            }
            Pane::Detail => {}
        }
    }

    fn open_editor(&mut self) {
        if self.focused_pane == Pane::Detail {
            if let Some(comment) = self.selected_comment().cloned() {
                self.comment_editor.open_existing(&comment);
                return;
            }
        }
        match self.action_post() {
            Some(post) => self.post_editor.open_existing(&post),
            None => self.status_message = "Nothing selected to edit.".to_string(),
        }
    }

    fn open_deletion(&mut self) {
        if self.focused_pane == Pane::Detail {
            if let Some(comment) = self.selected_comment().cloned() {
                self.deletion.open(DeleteTarget::Comment(comment));
                return;
            }
        }
        if let Some(post) = self.action_post() {
            self.deletion.open(DeleteTarget::Post(post));
        }
    }

    fn vote(&mut self, direction: VoteDirection) {
        if self.focused_pane == Pane::Detail {
            if let Some(comment) = self.selected_comment().cloned() {
                self.sync.vote_comment(&comment, direction);
                return;
            }
        }
        if let Some(post) = self.action_post() {
            self.sync.vote_post(&post, direction);
        }
    }

    fn handle_deletion_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Enter => match self.deletion.confirm() {
                Some(DeleteTarget::Post(post)) => {
                    self.sync.delete_post(&post);
                    self.status_message = format!("Deleting \"{}\"…", post.title);
                    if self.detail.as_ref().map(PostDetail::target_id) == Some(post.id.as_str()) {
                        let token = self.route.category_token().to_string();
                        self.navigate(Route::for_category(&token));
                    }
                }
                Some(DeleteTarget::Comment(comment)) => {
                    self.sync.remove_comment(&comment);
                    self.status_message = "Deleting comment…".to_string();
                }
                None => {}
            },
            KeyCode::Char('n') | KeyCode::Esc => self.deletion.cancel(),
            _ => {}
        }
    }

    fn handle_comment_editor_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.comment_editor.close(),
            KeyCode::Tab => {
                if let Some(draft) = self.comment_editor.draft_mut() {
                    draft.next_field();
                }
            }
            KeyCode::Enter => match self.comment_editor.submit() {
                Ok(CommentSubmission::Create(comment)) => {
                    self.sync.create_comment(comment);
                    self.status_message = "Posting comment…".to_string();
                }
                Ok(CommentSubmission::Update { original, edit }) => {
                    self.sync.update_comment(&original, edit);
                    self.status_message = "Saving comment…".to_string();
                }
                Err(err) => self.status_message = err.to_string(),
            },
            KeyCode::Backspace => {
                if let Some(draft) = self.comment_editor.draft_mut() {
                    draft.active_input().backspace();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(draft) = self.comment_editor.draft_mut() {
                    draft.active_input().insert(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_post_editor_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.post_editor.close(),
            KeyCode::Tab => {
                if let Some(draft) = self.post_editor.draft_mut() {
                    draft.next_field();
                }
            }
            KeyCode::Enter => {
                let state = Arc::clone(&self.state);
                match self.post_editor.submit(|path| state.category(path).is_some()) {
                    Ok(PostSubmission::Create(post)) => {
                        self.status_message = format!("Publishing \"{}\"…", post.title);
                        self.sync.create_post(post);
                    }
                    Ok(PostSubmission::Update { id, edit }) => {
                        self.sync.update_post(&id, edit);
                        self.status_message = "Saving post…".to_string();
                    }
                    Err(err) => self.status_message = err.to_string(),
                }
            }
            KeyCode::Backspace => {
                if let Some(draft) = self.post_editor.draft_mut() {
                    draft.active_input().backspace();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(draft) = self.post_editor.draft_mut() {
                    draft.active_input().insert(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_goto_key(&mut self, code: KeyCode) {
        let Some(input) = self.goto.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.goto = None,
            KeyCode::Enter => {
                let path = input.value().trim().to_string();
                self.goto = None;
                self.navigate(Route::parse(&path));
            }
            KeyCode::Backspace => input.backspace(),
            KeyCode::Char(ch) => input.insert(ch),
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        frame.render_widget(self.status_line(), layout[0]);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(20),
                Constraint::Percentage(35),
                Constraint::Percentage(45),
            ])
            .split(layout[1]);
        self.draw_categories(frame, main_chunks[0]);
        self.draw_posts(frame, main_chunks[1]);
        self.draw_detail(frame, main_chunks[2]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);

        if self.comment_editor.is_open() {
            self.draw_comment_editor(frame, layout[1]);
        } else if self.post_editor.is_open() {
            self.draw_post_editor(frame, layout[1]);
        } else if self.goto.is_some() {
            self.draw_goto(frame, layout[1]);
        }
        if self.deletion.is_open() {
            self.draw_deletion(frame, layout[1]);
        }
    }

    fn status_line(&self) -> Paragraph<'static> {
        let (text, fg) = match self.state.notice.as_ref() {
            Some(notice) => (notice.text(), COLOR_ERROR),
            None if self.sync.is_busy() => (
                format!("{} {}", self.spinner.frame(), self.status_message)
                    .trim()
                    .to_string(),
                COLOR_TEXT_PRIMARY,
            ),
            None => (self.status_message.clone(), COLOR_TEXT_PRIMARY),
        };
        let location = format!(
            "{} · {} ",
            self.route.path(),
            self.state.view.sort_order.label()
        );
        Paragraph::new(Line::from(vec![
            Span::styled(text, Style::default().fg(fg)),
            Span::raw("  "),
            Span::styled(location, Style::default().fg(COLOR_TEXT_SECONDARY)),
        ]))
        .style(
            Style::default()
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        )
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let focused = self.focused_pane == pane;
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn highlight_style(&self, pane: Pane) -> Style {
        let bg = if self.focused_pane == pane {
            COLOR_PANEL_SELECTED_BG
        } else {
            COLOR_PANEL_FOCUSED_BG
        };
        Style::default()
            .bg(bg)
            .fg(COLOR_TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    fn draw_categories(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Categories, Pane::Categories.title().to_string());
        let selected = &self.state.view.selected_category;
        let items: Vec<ListItem> = self
            .category_entries()
            .into_iter()
            .map(|(token, name)| {
                let marker = if &token == selected { "● " } else { "  " };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, Style::default().fg(COLOR_SUCCESS)),
                    Span::styled(name, Style::default().fg(COLOR_TEXT_PRIMARY)),
                ]))
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(self.nav_index));
        let list = List::new(items)
            .block(block)
            .highlight_style(self.highlight_style(Pane::Categories));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_posts(&self, frame: &mut Frame<'_>, area: Rect) {
        let label = selectors::category_label(&self.state, &self.state.view.selected_category);
        let block = self.pane_block(Pane::Posts, format!("{} · {}", Pane::Posts.title(), label));
        let width = block.inner(area).width.max(1) as usize;
        let posts = self.visible_posts();

        if posts.is_empty() {
            let message = if self.sync.is_loading(&Slot::Posts) {
                format!("{} Loading posts…", self.spinner.frame())
            } else {
                "No posts here yet. Press n to write one.".to_string()
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = posts
            .iter()
            .map(|post| {
                let title = truncate_to_width(&post.title, width);
                let meta = format!(
                    "▲ {}  💬 {}  {} · {} · {}",
                    post.vote_score,
                    post.comment_count,
                    post.author,
                    post.category,
                    format_timestamp(post.timestamp)
                );
                ListItem::new(vec![
                    Line::from(Span::styled(
                        title,
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        truncate_to_width(&meta, width),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ])
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(self.post_index));
        let list = List::new(items)
            .block(block)
            .highlight_style(self.highlight_style(Pane::Posts));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_detail(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Detail, Pane::Detail.title().to_string());
        let width = block.inner(area).width.max(1) as usize;

        let Some(detail) = self.detail.as_ref() else {
            let hint = Paragraph::new("Select a post and press Enter to read it.")
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(hint, area);
            return;
        };

        let Some(post) = detail.post(&self.state) else {
            let text = if self.sync.is_loading(&Slot::Posts) {
                format!("{} Loading post…", self.spinner.frame())
            } else {
                format!("Post '{}' was not found.", detail.target_id())
            };
            let missing = Paragraph::new(text)
                .style(Style::default().fg(COLOR_ERROR))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(missing, area);
            return;
        };

        let focused = self.focused_pane == Pane::Detail;
        let selected_style = |selected: bool| {
            if selected && focused {
                Style::default().bg(COLOR_PANEL_SELECTED_BG)
            } else {
                Style::default()
            }
        };

        let mut lines: Vec<Line<'static>> = Vec::new();
        let post_style = selected_style(self.detail_index == 0);
        lines.extend(wrap_plain(
            &post.title,
            width,
            post_style
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(Span::styled(
            format!(
                "▲ {} · {} · {} · {}",
                post.vote_score,
                post.author,
                post.category,
                format_timestamp(post.timestamp)
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
        lines.push(Line::default());
        lines.extend(wrap_plain(
            &post.body,
            width,
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ));
        lines.push(Line::default());

        let comments = detail.comments(&self.state);
        let heading = if self.sync.is_loading(&Slot::Comments {
            post_id: post.id.clone(),
        }) {
            format!("{} Comments ({}) loading…", self.spinner.frame(), comments.len())
        } else {
            format!("Comments ({})", comments.len())
        };
        lines.push(Line::from(Span::styled(
            heading,
            Style::default()
                .fg(COLOR_SUCCESS)
                .add_modifier(Modifier::BOLD),
        )));

        let mut scroll = 0usize;
        for (idx, comment) in comments.iter().enumerate() {
            let selected = self.detail_index == idx + 1;
            if selected {
                scroll = lines.len();
            }
            lines.push(Line::from(Span::styled(
                format!(
                    "▲ {} · {} · {}",
                    comment.vote_score,
                    comment.author,
                    format_timestamp(comment.timestamp)
                ),
                selected_style(selected).fg(COLOR_TEXT_SECONDARY),
            )));
            lines.extend(wrap_with_prefix(
                &comment.body,
                width,
                "  ",
                selected_style(selected).fg(COLOR_TEXT_PRIMARY),
            ));
        }

        let height = block.inner(area).height as usize;
        let offset = scroll.saturating_sub(height.saturating_sub(3));
        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((offset.min(u16::MAX as usize) as u16, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_popup(&self, frame: &mut Frame<'_>, area: Rect, title: &str, body: Text<'static>) {
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(body)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG))
                    .padding(Padding::uniform(1)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(popup, area);
    }

    fn draw_comment_editor(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(draft) = self.comment_editor.draft() else {
            return;
        };
        let mut lines = Vec::new();
        lines.push(field_line("Body", draft.body.value(), draft.field == CommentField::Body));
        if draft.is_new() {
            lines.push(field_line(
                "Author",
                draft.author.value(),
                draft.field == CommentField::Author,
            ));
        }
        lines.push(Line::default());
        lines.push(hint_line("Enter save · Tab next field · Esc cancel"));
        let title = if draft.is_new() {
            "New comment"
        } else {
            "Edit comment"
        };
        self.draw_popup(frame, centered_rect(60, 40, area), title, Text::from(lines));
    }

    fn draw_post_editor(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(draft) = self.post_editor.draft() else {
            return;
        };
        let mut lines: Vec<Line<'static>> = draft
            .fields()
            .iter()
            .map(|field| field_line(field.label(), draft.input(*field).value(), draft.field == *field))
            .collect();
        if draft.is_new() {
            let known: Vec<&str> = self
                .state
                .categories
                .iter()
                .map(|category| category.path.as_str())
                .collect();
            lines.push(Line::default());
            lines.push(hint_line(&format!("Categories: {}", known.join(", "))));
        }
        lines.push(Line::default());
        lines.push(hint_line("Enter save · Tab next field · Esc cancel"));
        let title = if draft.is_new() { "New post" } else { "Edit post" };
        self.draw_popup(frame, centered_rect(70, 50, area), title, Text::from(lines));
    }

    fn draw_goto(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(input) = self.goto.as_ref() else {
            return;
        };
        let lines = vec![
            field_line("Path", input.value(), true),
            Line::default(),
            hint_line("/, /:category or /:category/:post_id · Enter go · Esc cancel"),
        ];
        self.draw_popup(frame, centered_rect(60, 30, area), "Go to", Text::from(lines));
    }

    fn draw_deletion(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(target) = self.deletion.target() else {
            return;
        };
        let subject = match target {
            DeleteTarget::Post(post) => post.title.clone(),
            DeleteTarget::Comment(comment) => truncate_to_width(&comment.body, 60),
        };
        let lines = vec![
            Line::from(Span::styled(
                target.prompt(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(subject, Style::default().fg(COLOR_TEXT_SECONDARY))),
            Line::default(),
            hint_line("y confirm · n cancel"),
        ];
        self.draw_popup(frame, centered_rect(50, 30, area), "Confirm delete", Text::from(lines));
    }

    fn footer_text(&self) -> String {
        let mut parts = Vec::new();
        parts.push("j/k move".to_string());
        parts.push("h/l panes".to_string());
        match self.focused_pane {
            Pane::Categories => parts.push("Enter open category".to_string()),
            Pane::Posts => parts.push("Enter read post".to_string()),
            Pane::Detail => {
                parts.push("a comment".to_string());
                parts.push("Esc back".to_string());
            }
        }
        parts.push("n new post".to_string());
        parts.push("e edit".to_string());
        parts.push("x delete".to_string());
        parts.push("u/d vote".to_string());
        parts.push(format!("s sort ({})", self.state.view.sort_order.next().label()));
        parts.push("g go to".to_string());
        parts.push("r refresh".to_string());
        parts.push("q quit".to_string());

        parts.join(" · ")
    }

    #[cfg(test)]
    fn settle(&mut self) {
        for _ in 0..20 {
            self.sync.settle(&mut self.store, Duration::from_secs(5));
            self.observe_state();
            if !self.sync.is_busy() {
                break;
            }
        }
    }
}

fn field_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_style = if active {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    let cursor = if active { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label}: "), label_style),
        Span::styled(
            format!("{value}{cursor}"),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ),
    ])
}

fn hint_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(COLOR_TEXT_SECONDARY)
            .add_modifier(Modifier::ITALIC),
    ))
}

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    wrap_with_prefix(text, width, "", style)
}

fn wrap_with_prefix(text: &str, width: usize, prefix: &str, style: Style) -> Vec<Line<'static>> {
    if text.trim().is_empty() {
        return vec![Line::from(Span::styled(String::new(), style))];
    }
    let wrap_width = width.max(prefix.chars().count() + 1);
    let options = WrapOptions::new(wrap_width)
        .break_words(false)
        .initial_indent(prefix)
        .subsequent_indent(prefix);

    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                return vec![Line::from(Span::styled(String::new(), style))];
            }
            wrap(line, &options)
                .into_iter()
                .map(|cow| Line::from(Span::styled(cow.into_owned(), style)))
                .collect()
        })
        .collect()
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    let budget = width.saturating_sub(1);
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}
