//! View-set actions.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use http::Method;

/// The operation a view-set performs for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// `POST` on the collection.
    Create,
    /// `PUT` on an object.
    Update,
    /// `PATCH` on an object.
    PartialUpdate,
    /// `DELETE` on an object.
    Destroy,
    /// `GET` on an object.
    Retrieve,
    /// `GET` on the collection.
    List,
    /// An extra action registered under its own name.
    Custom(String),
}

impl Action {
    /// Returns the action name, e.g. `"partial_update"`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
            Self::Retrieve => "retrieve",
            Self::List => "list",
            Self::Custom(name) => name,
        }
    }

    /// Maps a method to the standard action, as a router would.
    ///
    /// `detail` is `true` for object routes (`/items/{pk}/`) and `false` for
    /// the collection route.
    ///
    /// ```
    /// use commonkit_views::Action;
    /// use http::Method;
    ///
    /// assert_eq!(Action::from_method(&Method::GET, false), Some(Action::List));
    /// assert_eq!(Action::from_method(&Method::PATCH, true), Some(Action::PartialUpdate));
    /// assert_eq!(Action::from_method(&Method::DELETE, false), None);
    /// ```
    pub fn from_method(method: &Method, detail: bool) -> Option<Self> {
        match (method, detail) {
            (&Method::GET, false) => Some(Self::List),
            (&Method::POST, false) => Some(Self::Create),
            (&Method::GET, true) => Some(Self::Retrieve),
            (&Method::PUT, true) => Some(Self::Update),
            (&Method::PATCH, true) => Some(Self::PartialUpdate),
            (&Method::DELETE, true) => Some(Self::Destroy),
            _ => None,
        }
    }

    /// Returns `true` for actions addressed to a single object.
    pub const fn is_detail(&self) -> bool {
        matches!(
            self,
            Self::Update | Self::PartialUpdate | Self::Destroy | Self::Retrieve
        )
    }
}

impl FromStr for Action {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "create" => Self::Create,
            "update" => Self::Update,
            "partial_update" => Self::PartialUpdate,
            "destroy" => Self::Destroy,
            "retrieve" => Self::Retrieve,
            "list" => Self::List,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
