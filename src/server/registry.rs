use std::collections::HashMap;

use mio::Token;

use super::connection::{Connection, Phase};

/// Token of the listening socket.
pub const LISTENER: Token = Token(0);
/// Token of the cross-thread waker.
pub const WAKER: Token = Token(1);

const FIRST_CONNECTION: usize = 2;

/// Live connections keyed by poll token.
///
/// Tokens are handed out monotonically and never reused, so a timer that
/// outlives its connection can only miss, never hit a newer one.
#[derive(Debug)]
pub struct Registry<S> {
    connections: HashMap<Token, Connection<S>>,
    next_id: usize,
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: FIRST_CONNECTION,
        }
    }

    /// The token the next [`Registry::insert`] will return.
    pub fn next_token(&self) -> Token {
        Token(self.next_id)
    }

    pub fn insert(&mut self, connection: Connection<S>) -> Token {
        let token = self.next_token();
        self.next_id += 1;
        self.connections.insert(token, connection);
        token
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Connection<S>> {
        self.connections.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<Connection<S>> {
        self.connections.remove(&token)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.connections.contains_key(&token)
    }

    pub fn phase(&self, token: Token) -> Option<Phase> {
        self.connections.get(&token).map(Connection::phase)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Removes every connection, e.g. on shutdown.
    pub fn drain(&mut self) -> impl Iterator<Item = (Token, Connection<S>)> + '_ {
        self.connections.drain()
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}
