// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use nostr_sdk::prelude::*;

use crate::error::{NwcError, Result};

pub const INFO_KIND: u16 = 13194;
pub const REQUEST_KIND: u16 = 23194;
pub const RESPONSE_KIND: u16 = 23195;
pub const NOTIFICATION_KIND_NIP04: u16 = 23196;
pub const NOTIFICATION_KIND_NIP44: u16 = 23197;

pub fn info_kind() -> Kind {
    Kind::Custom(INFO_KIND)
}

pub fn request_kind() -> Kind {
    Kind::Custom(REQUEST_KIND)
}

pub fn response_kind() -> Kind {
    Kind::Custom(RESPONSE_KIND)
}

/// Unsigned event contents. `created_at` defaults to now at signing time.
#[derive(Debug, Clone)]
pub struct EventTemplate {
    pub kind: Kind,
    pub created_at: Option<Timestamp>,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl EventTemplate {
    pub fn new(kind: Kind, content: impl Into<String>) -> Self {
        Self {
            kind,
            created_at: None,
            tags: Vec::new(),
            content: content.into(),
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Sign a template. The id is the hash of the canonical
/// `[0, pubkey, created_at, kind, tags, content]` serialization.
pub fn sign_event(template: EventTemplate, keys: &Keys) -> Result<Event> {
    let mut builder = EventBuilder::new(template.kind, template.content).tags(template.tags);
    if let Some(created_at) = template.created_at {
        builder = builder.custom_created_at(created_at);
    }
    builder
        .sign_with_keys(keys)
        .map_err(|e| NwcError::Crypto(format!("sign event: {e}")))
}

pub fn tag(name: &str, values: &[&str]) -> Tag {
    Tag::custom(
        TagKind::custom(name.to_string()),
        values.iter().map(|v| v.to_string()),
    )
}

/// First value of the first tag named `name`.
pub fn tag_value<'a>(event: &'a Event, name: &str) -> Option<&'a str> {
    event.tags.iter().find_map(|tag| {
        let slice = tag.as_slice();
        match slice {
            [key, value, ..] if key == name => Some(value.as_str()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_content_addressed() {
        let keys = Keys::generate();
        let ts = Timestamp::from(1_700_000_000);
        let template = EventTemplate::new(request_kind(), "payload")
            .tag(Tag::public_key(Keys::generate().public_key()))
            .tag(tag("encryption", &["nip44_v2"]))
            .created_at(ts);

        let a = sign_event(template.clone(), &keys).unwrap();
        let b = sign_event(template, &keys).unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.verify().is_ok());
        assert_eq!(a.created_at, ts);
    }

    #[test]
    fn test_tag_value() {
        let keys = Keys::generate();
        let event = sign_event(
            EventTemplate::new(response_kind(), "x")
                .tag(tag("d", &["item-1"]))
                .tag(tag("encryption", &["nip04"])),
            &keys,
        )
        .unwrap();
        assert_eq!(tag_value(&event, "d"), Some("item-1"));
        assert_eq!(tag_value(&event, "encryption"), Some("nip04"));
        assert_eq!(tag_value(&event, "e"), None);
    }
}
