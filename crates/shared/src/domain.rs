use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::{Map, Value};

/// Accepts ids stored as text or as integer columns; both are kept as text.
struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer id")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
        Ok(value.to_string())
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PostId);

/// User record issued by the remote auth service.
///
/// Only `id` and `email` are ever read locally; every other attribute is kept
/// in `extra` so the record round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: UserId::new(id),
            email,
            role: None,
            created_at: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub author: String,
    pub date: String,
}

/// A post that has not been stored yet; the remote service assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlogPost {
    pub title: String,
    pub text: String,
    pub author: String,
    pub date: String,
}

impl NewBlogPost {
    pub fn with_id(self, id: PostId) -> BlogPost {
        BlogPost {
            id,
            title: self.title,
            text: self.text,
            author: self.author,
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_unknown_attributes() {
        let raw = serde_json::json!({
            "id": "u-1",
            "email": "a@example.com",
            "aud": "authenticated",
            "app_metadata": {"provider": "email"}
        });

        let identity: Identity = serde_json::from_value(raw.clone()).expect("identity");
        assert_eq!(identity.id.as_str(), "u-1");
        assert_eq!(identity.email.as_deref(), Some("a@example.com"));
        assert_eq!(serde_json::to_value(&identity).expect("encode"), raw);
    }

    #[test]
    fn post_id_serializes_as_plain_string() {
        let post = NewBlogPost {
            title: "A".into(),
            text: "x".into(),
            author: "u".into(),
            date: "2024-01-01".into(),
        }
        .with_id(PostId::new("1"));

        let value = serde_json::to_value(&post).expect("encode");
        assert_eq!(value["id"], "1");
        assert_eq!(value["date"], "2024-01-01");
    }

    #[test]
    fn integer_post_ids_decode_as_text() {
        let post: BlogPost = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "A",
            "text": "x",
            "author": "u",
            "date": "2024-01-01"
        }))
        .expect("numeric id");
        assert_eq!(post.id, PostId::new("1"));

        let negative: PostId = serde_json::from_value(serde_json::json!(-7)).expect("signed id");
        assert_eq!(negative.as_str(), "-7");
    }

    #[test]
    fn fractional_or_null_ids_are_rejected() {
        assert!(serde_json::from_value::<PostId>(serde_json::json!(1.5)).is_err());
        assert!(serde_json::from_value::<PostId>(serde_json::Value::Null).is_err());
    }
}
