//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::ArticleStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Credential secret. Cleared before a user is attached to an article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn without_secret(mut self) -> Self {
        self.password = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

/// Flat article row as stored, with writer/editor as bare ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image: Option<String>,
    pub image_caption: Option<String>,
    pub status: ArticleStatus,
    pub publish_date: Option<OffsetDateTime>,
    pub writer_id: Option<i64>,
    pub editor_id: Option<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ArticleRecord {
    /// Writer id when it refers to a user; zero counts as absent.
    pub fn writer_ref(&self) -> Option<i64> {
        self.writer_id.filter(|id| *id > 0)
    }

    /// Editor id when it refers to a user; zero counts as absent.
    pub fn editor_ref(&self) -> Option<i64> {
        self.editor_id.filter(|id| *id > 0)
    }
}

/// Article with its writer, editor and topics resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image: Option<String>,
    pub image_caption: Option<String>,
    pub status: ArticleStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub publish_date: Option<OffsetDateTime>,
    pub writer: Option<User>,
    pub editor: Option<User>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub topics: Vec<Topic>,
}

impl Article {
    pub fn from_record(
        record: ArticleRecord,
        writer: Option<User>,
        editor: Option<User>,
        topics: Vec<Topic>,
    ) -> Self {
        Self {
            id: record.id,
            title: record.title,
            slug: record.slug,
            content: record.content,
            image: record.image,
            image_caption: record.image_caption,
            status: record.status,
            publish_date: record.publish_date,
            writer,
            editor,
            created_at: record.created_at,
            updated_at: record.updated_at,
            topics,
        }
    }
}
