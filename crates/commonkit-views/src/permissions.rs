//! Permission checks for view-set actions.
//!
//! A view-set lists permissions as [`PermissionClass`] constructors, one list
//! per action. A fresh instance is created for every check.

use commonkit_http::HttpRequest;

use crate::actions::Action;

/// The message used when a permission does not supply its own.
pub const DEFAULT_DENIED_MESSAGE: &str = "You do not have permission to perform this action.";

/// Decides whether a request may run an action.
pub trait Permission: Send + Sync {
    /// Returns `true` when the request is allowed.
    fn has_permission(&self, request: &HttpRequest, action: &Action) -> bool;

    /// The message reported when the check fails.
    fn message(&self) -> &str {
        DEFAULT_DENIED_MESSAGE
    }
}

/// Creates a permission instance.
pub type PermissionClass = fn() -> Box<dyn Permission>;

macro_rules! permission_class {
    ($ty:ident) => {
        impl $ty {
            /// Constructor for use in permission lists.
            pub const CLASS: PermissionClass = {
                fn construct() -> Box<dyn Permission> {
                    Box::new($ty)
                }
                construct
            };
        }
    };
}

// ── Built-in permissions ────────────────────────────────────────────

/// Allows every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl Permission for AllowAny {
    fn has_permission(&self, _request: &HttpRequest, _action: &Action) -> bool {
        true
    }
}

permission_class!(AllowAny);

/// Allows authenticated requests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, request: &HttpRequest, _action: &Action) -> bool {
        request.is_authenticated()
    }

    fn message(&self) -> &str {
        "Authentication credentials were not provided."
    }
}

permission_class!(IsAuthenticated);

/// Allows staff users only.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAdminUser;

impl Permission for IsAdminUser {
    fn has_permission(&self, request: &HttpRequest, _action: &Action) -> bool {
        request.user().is_some_and(|user| user.is_staff)
    }
}

permission_class!(IsAdminUser);

/// Allows safe methods for anyone and writes for authenticated requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticatedOrReadOnly;

impl Permission for IsAuthenticatedOrReadOnly {
    fn has_permission(&self, request: &HttpRequest, _action: &Action) -> bool {
        request.is_safe_method() || request.is_authenticated()
    }
}

permission_class!(IsAuthenticatedOrReadOnly);

#[cfg(test)]
mod tests {
    use super::*;
    use commonkit_http::AuthUser;
    use http::Method;

    fn request(method: Method, user: Option<AuthUser>) -> HttpRequest {
        let builder = HttpRequest::builder().method(method).path("/items/");
        match user {
            Some(user) => builder.user(user).build(),
            None => builder.build(),
        }
    }

    fn allowed(class: PermissionClass, request: &HttpRequest) -> bool {
        class().has_permission(request, &Action::List)
    }

    #[test]
    fn test_allow_any() {
        assert!(allowed(AllowAny::CLASS, &request(Method::DELETE, None)));
    }

    #[test]
    fn test_is_authenticated() {
        assert!(!allowed(IsAuthenticated::CLASS, &request(Method::GET, None)));
        assert!(allowed(
            IsAuthenticated::CLASS,
            &request(Method::GET, Some(AuthUser::new("ann")))
        ));
        assert_eq!(
            IsAuthenticated::CLASS().message(),
            "Authentication credentials were not provided."
        );
    }

    #[test]
    fn test_is_admin_user() {
        let staff = AuthUser {
            is_staff: true,
            ..AuthUser::new("root")
        };
        assert!(allowed(IsAdminUser::CLASS, &request(Method::GET, Some(staff))));
        assert!(!allowed(
            IsAdminUser::CLASS,
            &request(Method::GET, Some(AuthUser::new("ann")))
        ));
        assert_eq!(IsAdminUser::CLASS().message(), DEFAULT_DENIED_MESSAGE);
    }

    #[test]
    fn test_read_only_for_anonymous() {
        assert!(allowed(IsAuthenticatedOrReadOnly::CLASS, &request(Method::GET, None)));
        assert!(!allowed(IsAuthenticatedOrReadOnly::CLASS, &request(Method::POST, None)));
        assert!(allowed(
            IsAuthenticatedOrReadOnly::CLASS,
            &request(Method::POST, Some(AuthUser::new("ann")))
        ));
    }
}
