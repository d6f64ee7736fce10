//! Modal interaction surfaces: comment editor, post editor and deletion
//! confirmation. Each one is either closed or open with a payload; nothing
//! survives a close.

use crate::model::{Comment, CommentEdit, NewComment, NewPost, Post, PostEdit};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("editor is not open")]
    Closed,
    #[error("write something first")]
    EmptyBody,
    #[error("a title is required")]
    EmptyTitle,
    #[error("an author is required")]
    EmptyAuthor,
    #[error("pick a category")]
    MissingCategory,
}

/// Text field with a cursor at the end, enough for single pane editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn insert(&mut self, ch: char) {
        self.value.push(ch);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Comment editor

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentPayload {
    New { parent_id: String },
    Existing(Comment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentField {
    Body,
    Author,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub payload: CommentPayload,
    pub body: TextInput,
    pub author: TextInput,
    pub field: CommentField,
}

impl CommentDraft {
    pub fn is_new(&self) -> bool {
        matches!(self.payload, CommentPayload::New { .. })
    }

    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            CommentField::Body => &mut self.body,
            CommentField::Author => &mut self.author,
        }
    }

    /// Existing comments keep their author, so only new ones cycle fields.
    pub fn next_field(&mut self) {
        if !self.is_new() {
            return;
        }
        self.field = match self.field {
            CommentField::Body => CommentField::Author,
            CommentField::Author => CommentField::Body,
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSubmission {
    Create(NewComment),
    Update { original: Comment, edit: CommentEdit },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommentEditor {
    #[default]
    Closed,
    Open(CommentDraft),
}

impl CommentEditor {
    pub fn open_new(&mut self, parent_id: &str, author: &str) {
        *self = CommentEditor::Open(CommentDraft {
            payload: CommentPayload::New {
                parent_id: parent_id.to_string(),
            },
            body: TextInput::default(),
            author: TextInput::with_value(author),
            field: CommentField::Body,
        });
    }

    pub fn open_existing(&mut self, comment: &Comment) {
        *self = CommentEditor::Open(CommentDraft {
            payload: CommentPayload::Existing(comment.clone()),
            body: TextInput::with_value(comment.body.clone()),
            author: TextInput::with_value(comment.author.clone()),
            field: CommentField::Body,
        });
    }

    pub fn close(&mut self) {
        *self = CommentEditor::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CommentEditor::Open(_))
    }

    pub fn draft(&self) -> Option<&CommentDraft> {
        match self {
            CommentEditor::Open(draft) => Some(draft),
            CommentEditor::Closed => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut CommentDraft> {
        match self {
            CommentEditor::Open(draft) => Some(draft),
            CommentEditor::Closed => None,
        }
    }

    /// Validates the draft and closes the editor. An invalid draft stays open.
    pub fn submit(&mut self) -> Result<CommentSubmission, DraftError> {
        let draft = self.draft().ok_or(DraftError::Closed)?;
        if draft.body.is_blank() {
            return Err(DraftError::EmptyBody);
        }
        let submission = match &draft.payload {
            CommentPayload::New { parent_id } => {
                if draft.author.is_blank() {
                    return Err(DraftError::EmptyAuthor);
                }
                CommentSubmission::Create(NewComment::new(
                    parent_id,
                    draft.body.value(),
                    draft.author.value(),
                ))
            }
            CommentPayload::Existing(original) => CommentSubmission::Update {
                original: original.clone(),
                edit: CommentEdit::new(draft.body.value()),
            },
        };
        self.close();
        Ok(submission)
    }
}

// ---------------------------------------------------------------------------
// Post editor

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPayload {
    New,
    Existing(Post),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Title,
    Body,
    Category,
    Author,
}

impl PostField {
    pub fn label(self) -> &'static str {
        match self {
            PostField::Title => "Title",
            PostField::Body => "Body",
            PostField::Category => "Category",
            PostField::Author => "Author",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub payload: PostPayload,
    pub title: TextInput,
    pub body: TextInput,
    pub category: TextInput,
    pub author: TextInput,
    pub field: PostField,
}

impl PostDraft {
    pub fn is_new(&self) -> bool {
        matches!(self.payload, PostPayload::New)
    }

    pub fn fields(&self) -> &'static [PostField] {
        if self.is_new() {
            &[
                PostField::Title,
                PostField::Body,
                PostField::Category,
                PostField::Author,
            ]
        } else {
            &[PostField::Title, PostField::Body]
        }
    }

    pub fn input(&self, field: PostField) -> &TextInput {
        match field {
            PostField::Title => &self.title,
            PostField::Body => &self.body,
            PostField::Category => &self.category,
            PostField::Author => &self.author,
        }
    }

    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            PostField::Title => &mut self.title,
            PostField::Body => &mut self.body,
            PostField::Category => &mut self.category,
            PostField::Author => &mut self.author,
        }
    }

    pub fn next_field(&mut self) {
        let fields = self.fields();
        let index = fields
            .iter()
            .position(|field| *field == self.field)
            .unwrap_or(0);
        self.field = fields[(index + 1) % fields.len()];
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostSubmission {
    Create(NewPost),
    Update { id: String, edit: PostEdit },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PostEditor {
    #[default]
    Closed,
    Open(PostDraft),
}

impl PostEditor {
    pub fn open_new(&mut self, category: &str, author: &str) {
        *self = PostEditor::Open(PostDraft {
            payload: PostPayload::New,
            title: TextInput::default(),
            body: TextInput::default(),
            category: TextInput::with_value(category),
            author: TextInput::with_value(author),
            field: PostField::Title,
        });
    }

    pub fn open_existing(&mut self, post: &Post) {
        *self = PostEditor::Open(PostDraft {
            payload: PostPayload::Existing(post.clone()),
            title: TextInput::with_value(post.title.clone()),
            body: TextInput::with_value(post.body.clone()),
            category: TextInput::with_value(post.category.clone()),
            author: TextInput::with_value(post.author.clone()),
            field: PostField::Title,
        });
    }

    pub fn close(&mut self) {
        *self = PostEditor::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PostEditor::Open(_))
    }

    pub fn draft(&self) -> Option<&PostDraft> {
        match self {
            PostEditor::Open(draft) => Some(draft),
            PostEditor::Closed => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut PostDraft> {
        match self {
            PostEditor::Open(draft) => Some(draft),
            PostEditor::Closed => None,
        }
    }

    /// `is_known_category` guards new posts against categories the board
    /// does not have.
    pub fn submit(
        &mut self,
        is_known_category: impl Fn(&str) -> bool,
    ) -> Result<PostSubmission, DraftError> {
        let draft = self.draft().ok_or(DraftError::Closed)?;
        if draft.title.is_blank() {
            return Err(DraftError::EmptyTitle);
        }
        if draft.body.is_blank() {
            return Err(DraftError::EmptyBody);
        }
        let submission = match &draft.payload {
            PostPayload::New => {
                let category = draft.category.value().trim();
                if !is_known_category(category) {
                    return Err(DraftError::MissingCategory);
                }
                if draft.author.is_blank() {
                    return Err(DraftError::EmptyAuthor);
                }
                PostSubmission::Create(NewPost::new(
                    draft.title.value(),
                    draft.body.value(),
                    draft.author.value(),
                    category,
                ))
            }
            PostPayload::Existing(post) => PostSubmission::Update {
                id: post.id.clone(),
                edit: PostEdit {
                    title: draft.title.value().trim().to_string(),
                    body: draft.body.value().trim().to_string(),
                },
            },
        };
        self.close();
        Ok(submission)
    }
}

// ---------------------------------------------------------------------------
// Deletion confirmation

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Post(Post),
    Comment(Comment),
}

impl DeleteTarget {
    pub fn prompt(&self) -> &'static str {
        match self {
            DeleteTarget::Post(_) => "Delete the selected post and all of its comments?",
            DeleteTarget::Comment(_) => "Delete the selected comment?",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeletionConfirm {
    #[default]
    Closed,
    Open(DeleteTarget),
}

impl DeletionConfirm {
    pub fn open(&mut self, target: DeleteTarget) {
        *self = DeletionConfirm::Open(target);
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DeletionConfirm::Open(_))
    }

    pub fn target(&self) -> Option<&DeleteTarget> {
        match self {
            DeletionConfirm::Open(target) => Some(target),
            DeletionConfirm::Closed => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = DeletionConfirm::Closed;
    }

    /// Closes and hands back the target so the caller can dispatch removal.
    pub fn confirm(&mut self) -> Option<DeleteTarget> {
        match std::mem::take(self) {
            DeletionConfirm::Open(target) => Some(target),
            DeletionConfirm::Closed => None,
        }
    }
}
