//! Who may do what.
//!
//! Reads are public. Every write first passes the authentication gate, then a
//! collection rule: categories are staff-only, articles may be created by any
//! signed-in author and changed only by the author who wrote them.

use axum::http::Method;
use serde::Serialize;

use crate::errors::BlogError;
use crate::storage;

/// The signed-in identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

impl From<storage::User> for Identity {
    fn from(user: storage::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Identity),
}

impl Actor {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Actor::User(identity) => Some(identity),
            Actor::Anonymous => None,
        }
    }

    pub fn require_identity(&self) -> Result<&Identity, BlogError> {
        self.identity().ok_or(BlogError::AuthenticationRequired)
    }
}

/// What a request does to a collection, resolved once from method and path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    /// `targets_item` is true for `/collection/{id}/` paths.
    pub fn from_method(method: &Method, targets_item: bool) -> Option<Self> {
        match (method, targets_item) {
            (&Method::GET, false) | (&Method::HEAD, false) => Some(Action::List),
            (&Method::POST, false) => Some(Action::Create),
            (&Method::GET, true) | (&Method::HEAD, true) => Some(Action::Retrieve),
            (&Method::PUT, true) => Some(Action::Update),
            (&Method::PATCH, true) => Some(Action::PartialUpdate),
            (&Method::DELETE, true) => Some(Action::Destroy),
            _ => None,
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Reads pass for everyone, writes need a signed-in actor.
pub fn authenticated_or_read_only(actor: &Actor, action: Action) -> Result<(), BlogError> {
    if action.is_read() || actor.is_authenticated() {
        Ok(())
    } else {
        Err(BlogError::AuthenticationRequired)
    }
}

pub fn check_category(actor: &Actor, action: Action) -> Result<(), BlogError> {
    authenticated_or_read_only(actor, action)?;
    if action.is_read() {
        return Ok(());
    }
    match actor.identity() {
        Some(identity) if identity.is_staff => Ok(()),
        _ => Err(BlogError::PermissionDenied),
    }
}

/// Collection-level article rule, checked before the article is loaded.
pub fn check_article(actor: &Actor, action: Action) -> Result<(), BlogError> {
    authenticated_or_read_only(actor, action)
}

/// Object-level article rule: only the recorded author may change it.
pub fn check_article_owner(
    actor: &Actor,
    action: Action,
    author_id: i32,
) -> Result<(), BlogError> {
    if action.is_read() {
        return Ok(());
    }
    match actor.identity() {
        Some(identity) if identity.id == author_id => Ok(()),
        Some(_) => Err(BlogError::PermissionDenied),
        None => Err(BlogError::AuthenticationRequired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITES: [Action; 4] = [
        Action::Create,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
    ];

    fn user(id: i32, is_staff: bool) -> Actor {
        Actor::User(Identity {
            id,
            username: format!("user{id}"),
            is_staff,
        })
    }

    #[test]
    fn test_action_from_method() {
        assert_eq!(Action::from_method(&Method::GET, false), Some(Action::List));
        assert_eq!(Action::from_method(&Method::GET, true), Some(Action::Retrieve));
        assert_eq!(Action::from_method(&Method::POST, false), Some(Action::Create));
        assert_eq!(Action::from_method(&Method::PUT, true), Some(Action::Update));
        assert_eq!(
            Action::from_method(&Method::PATCH, true),
            Some(Action::PartialUpdate)
        );
        assert_eq!(Action::from_method(&Method::DELETE, true), Some(Action::Destroy));
        assert_eq!(Action::from_method(&Method::POST, true), None);
        assert_eq!(Action::from_method(&Method::DELETE, false), None);
    }

    #[test]
    fn test_reads_are_public() {
        for actor in [Actor::Anonymous, user(1, false), user(2, true)] {
            for action in [Action::List, Action::Retrieve] {
                assert!(check_category(&actor, action).is_ok());
                assert!(check_article(&actor, action).is_ok());
                assert!(check_article_owner(&actor, action, 99).is_ok());
            }
        }
    }

    #[test]
    fn test_category_writes_need_staff() {
        for action in WRITES {
            assert!(matches!(
                check_category(&Actor::Anonymous, action),
                Err(BlogError::AuthenticationRequired)
            ));
            assert!(matches!(
                check_category(&user(1, false), action),
                Err(BlogError::PermissionDenied)
            ));
            assert!(check_category(&user(2, true), action).is_ok());
        }
    }

    #[test]
    fn test_article_create_needs_only_authentication() {
        assert!(matches!(
            check_article(&Actor::Anonymous, Action::Create),
            Err(BlogError::AuthenticationRequired)
        ));
        assert!(check_article(&user(1, false), Action::Create).is_ok());
    }

    #[test]
    fn test_article_owner_rule() {
        let alice = user(1, false);
        let bob = user(2, false);
        let staff = user(3, true);

        for action in [Action::Update, Action::PartialUpdate, Action::Destroy] {
            assert!(check_article_owner(&alice, action, 1).is_ok());
            assert!(matches!(
                check_article_owner(&bob, action, 1),
                Err(BlogError::PermissionDenied)
            ));
            // staff get no special treatment on someone else's article
            assert!(matches!(
                check_article_owner(&staff, action, 1),
                Err(BlogError::PermissionDenied)
            ));
            assert!(matches!(
                check_article_owner(&Actor::Anonymous, action, 1),
                Err(BlogError::AuthenticationRequired)
            ));
        }
    }

    #[test]
    fn test_require_identity() {
        assert!(Actor::Anonymous.require_identity().is_err());
        assert_eq!(user(7, false).require_identity().unwrap().id, 7);
    }
}
