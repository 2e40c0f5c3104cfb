// Post request validation and response shapes

use crate::db::schema::Post;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TITLE_MIN: usize = 5;
const TITLE_MAX: usize = 255;
const CONTENT_MIN: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_content(&self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = self.title() {
            validate_title(title)?;
        }
        if let Some(content) = self.content() {
            validate_content(content)?;
        }
        Ok(())
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|s| !s.is_empty())
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostAuthor {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub user: PostAuthor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            user: PostAuthor {
                id: post.user_id,
                name: post.author_name,
                email: post.author_email,
            },
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "title must be between {} and {} characters",
            TITLE_MIN, TITLE_MAX
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<()> {
    if content.chars().count() < CONTENT_MIN {
        return Err(AppError::ValidationError(format!(
            "content must be at least {} characters",
            CONTENT_MIN
        )));
    }
    Ok(())
}
