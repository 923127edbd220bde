//! # commonkit-views
//!
//! View-sets that pick permissions per action and can validate with one
//! serializer while responding with another.
//!
//! ## Modules
//!
//! - [`actions`] - The [`Action`] enum and method-to-action routing
//! - [`permissions`] - The [`Permission`] trait and built-in permissions
//! - [`viewsets`] - [`GenericViewSet`] and [`ModelViewSet`]

pub mod actions;
pub mod permissions;
pub mod viewsets;

pub use actions::Action;
pub use permissions::{
    AllowAny, IsAdminUser, IsAuthenticated, IsAuthenticatedOrReadOnly, Permission,
    PermissionClass,
};
pub use viewsets::{GenericViewSet, ModelViewSet};
