//! Per-connection session state.
//!
//! A session is created on accept and destroyed when the connection loop
//! exits. It is a two-state machine: `Unauthenticated` until a successful
//! `login`, `Authenticated` thereafter. The only mutation is the commit of
//! a successful login (performed by the dispatcher, nothing else), and the
//! negotiated service repertoire is read-only from then on.

use std::collections::HashSet;

/// Credentials and repertoire recorded by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Authenticated client identifier (`<clID>`).
    pub clid: String,
    /// Negotiated language tag.
    pub lang: String,
    /// Object-service namespace URIs the client requested (`<objURI>`).
    pub objects: HashSet<String>,
    /// Extension namespace URIs the client requested (`<extURI>`).
    pub extensions: HashSet<String>,
}

/// The two-state session machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Credentials),
}

/// State of one client connection.
#[derive(Debug)]
pub struct Session {
    id: String,
    state: SessionState,
}

impl Session {
    /// Create an unauthenticated session. `id` is the server-side
    /// identifier minted at accept time; it names the session in logs.
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: SessionState::Unauthenticated,
        }
    }

    /// Session identifier minted at accept.
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// Authenticated client identifier, if logged in.
    pub fn clid(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(c) => Some(&c.clid),
            SessionState::Unauthenticated => None,
        }
    }

    /// Negotiated language, if logged in.
    pub fn lang(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(c) => Some(&c.lang),
            SessionState::Unauthenticated => None,
        }
    }

    /// Whether `uri` is in the session's object-service repertoire.
    pub fn has_object(&self, uri: &str) -> bool {
        match &self.state {
            SessionState::Authenticated(c) => c.objects.contains(uri),
            SessionState::Unauthenticated => false,
        }
    }

    /// Whether `uri` is in the session's extension repertoire.
    pub fn has_extension(&self, uri: &str) -> bool {
        match &self.state {
            SessionState::Authenticated(c) => c.extensions.contains(uri),
            SessionState::Unauthenticated => false,
        }
    }

    /// Commit a successful login. Called by the dispatcher only.
    pub(crate) fn authenticate(&mut self, credentials: Credentials) {
        self.state = SessionState::Authenticated(credentials);
    }

    /// Owned snapshot handed to handlers and hooks.
    pub fn view(&self) -> SessionView {
        let credentials = match &self.state {
            SessionState::Authenticated(c) => Some(c.clone()),
            SessionState::Unauthenticated => None,
        };
        SessionView {
            session_id: self.id.clone(),
            credentials,
        }
    }
}

/// Read-only snapshot of a [`Session`], safe to move into handler futures.
#[derive(Debug, Clone)]
pub struct SessionView {
    /// Session identifier minted at accept.
    pub session_id: String,
    /// Login credentials, absent before authentication.
    pub credentials: Option<Credentials>,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn clid(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.clid.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            clid: "gavin".to_string(),
            lang: "en".to_string(),
            objects: ["urn:ietf:params:xml:ns:domain-1.0".to_string()]
                .into_iter()
                .collect(),
            extensions: ["urn:ietf:params:xml:ns:loginSec-1.0".to_string()]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_starts_unauthenticated() {
        let session = Session::new("abc".to_string());
        assert!(!session.is_authenticated());
        assert_eq!(session.clid(), None);
        assert_eq!(session.lang(), None);
        assert!(!session.has_object("urn:ietf:params:xml:ns:domain-1.0"));
        assert!(!session.has_extension("urn:ietf:params:xml:ns:loginSec-1.0"));
    }

    #[test]
    fn test_authenticate_records_repertoire() {
        let mut session = Session::new("abc".to_string());
        session.authenticate(credentials());

        assert!(session.is_authenticated());
        assert_eq!(session.clid(), Some("gavin"));
        assert_eq!(session.lang(), Some("en"));
        assert!(session.has_object("urn:ietf:params:xml:ns:domain-1.0"));
        assert!(!session.has_object("urn:ietf:params:xml:ns:contact-1.0"));
        assert!(session.has_extension("urn:ietf:params:xml:ns:loginSec-1.0"));
        assert!(!session.has_extension("urn:ietf:params:xml:ns:secDNS-1.1"));
    }

    #[test]
    fn test_view_snapshots_state() {
        let mut session = Session::new("abc".to_string());

        let before = session.view();
        assert!(!before.is_authenticated());

        session.authenticate(credentials());
        let after = session.view();
        assert_eq!(after.clid(), Some("gavin"));
        assert_eq!(after.session_id, "abc");

        // The earlier snapshot is unaffected.
        assert!(!before.is_authenticated());
    }
}
