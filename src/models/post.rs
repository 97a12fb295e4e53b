//! Blog posts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validator::Validator;

/// Estimated reading time in minutes.
///
/// Travels over the wire as the string `"<n> mins"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ReadTime(pub i32);

pub const INVALID_READTIME_FORMAT: &str = "invalid readtime format";

impl ReadTime {
    pub fn minutes(&self) -> i32 {
        self.0
    }

    fn parse(value: &str) -> Option<Self> {
        let (minutes, unit) = value.split_once(' ')?;
        if unit != "mins" {
            return None;
        }
        minutes.parse::<i32>().ok().map(ReadTime)
    }
}

impl fmt::Display for ReadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for ReadTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReadTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReadTimeVisitor;

        impl Visitor<'_> for ReadTimeVisitor {
            type Value = ReadTime;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string of the form \"<n> mins\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ReadTime, E> {
                ReadTime::parse(value).ok_or_else(|| E::custom(INVALID_READTIME_FORMAT))
            }
        }

        deserializer.deserialize_str(ReadTimeVisitor)
    }
}

/// A post row together with its liker set.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub post_text: String,
    pub img: String,
    pub read_time: ReadTime,
    pub created_by: i64,
    pub version: i64,
    pub liked_by: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub post_text: String,
    pub img: String,
    pub read_time: ReadTime,
    pub created_by: i64,
}

/// Response body for a post, with the author's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub post_text: String,
    pub img: String,
    pub read_time: ReadTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub liked_by: Vec<i64>,
    pub created_by: i64,
    pub user_name: String,
    pub version: i64,
}

impl PostView {
    pub fn new(post: Post, user_name: impl Into<String>) -> Self {
        Self {
            id: post.id,
            created_at: post.created_at,
            title: post.title,
            post_text: post.post_text,
            img: post.img,
            read_time: post.read_time,
            liked_by: post.liked_by,
            created_by: post.created_by,
            user_name: user_name.into(),
            version: post.version,
        }
    }

    /// Split back into the stored post and the author's name.
    pub fn into_parts(self) -> (Post, String) {
        let post = Post {
            id: self.id,
            created_at: self.created_at,
            title: self.title,
            post_text: self.post_text,
            img: self.img,
            read_time: self.read_time,
            created_by: self.created_by,
            version: self.version,
            liked_by: self.liked_by,
        };
        (post, self.user_name)
    }
}

pub const MAX_TITLE_BYTES: usize = 100;

pub fn validate_post(
    v: &mut Validator,
    title: &str,
    post_text: &str,
    img: &str,
    read_time: ReadTime,
) {
    v.check(!title.is_empty(), "title", "Title must be provided");
    v.check(
        title.len() <= MAX_TITLE_BYTES,
        "title",
        "Title can only contain 100 characters or less",
    );
    v.check(!post_text.is_empty(), "postText", "Text must be provided");
    v.check(!img.is_empty(), "img", "Image must be provided");
    v.check(read_time.minutes() > 0, "readTime", "Read time must be provided");
}
