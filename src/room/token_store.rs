use std::collections::BTreeMap;

use subtle::ConstantTimeEq;

use crate::error::JoinError;

/// How a join attempt related to the room's token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBinding {
    /// The room was unseen; the supplied token is now its token
    Created,
    /// The supplied token matches the one bound at creation
    Matched,
}

/// Room name -> access token, bound by the first joiner.
#[derive(Debug, Default)]
pub struct RoomTokenStore {
    tokens: BTreeMap<String, String>,
}

impl RoomTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `token` to `room` if the room is new, otherwise check it.
    ///
    /// A mismatch leaves the bound token untouched.
    pub fn resolve_or_bind(&mut self, room: &str, token: &str) -> Result<TokenBinding, JoinError> {
        match self.tokens.get(room) {
            Some(bound) if tokens_match(bound, token) => Ok(TokenBinding::Matched),
            Some(_) => Err(JoinError::InvalidToken),
            None => {
                self.tokens.insert(room.to_string(), token.to_string());
                Ok(TokenBinding::Created)
            }
        }
    }

    pub fn token_for(&self, room: &str) -> Option<&str> {
        self.tokens.get(room).map(String::as_str)
    }

    /// Drop a room's binding so the next joiner creates it afresh.
    pub fn release(&mut self, room: &str) -> Option<String> {
        self.tokens.remove(room)
    }

    /// Rooms in name order with their tokens.
    pub fn rooms(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.tokens.iter().map(|(r, t)| (r.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn tokens_match(bound: &str, supplied: &str) -> bool {
    bound.as_bytes().ct_eq(supplied.as_bytes()).into()
}
