use std::collections::BTreeSet;

use storefront_session::config::UnauthenticatedBehavior;
use storefront_session::manager::Session;
use storefront_session::roles::{ROLE_ADMIN, ROLE_CLIENT};

/// Navigable views of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum View {
    Landing,
    Catalog,
    OrderHistory,
    CreateOrder,
    Admin,
}

/// Views enabled for the given session. A pure function of session state so
/// gating is testable without mounting anything.
///
/// Roles are not mutually exclusive: a principal holding both CLIENT and
/// ADMIN sees the union. An authenticated principal with neither role gets
/// only the public landing view.
pub fn permitted_views(session: &Session, behavior: UnauthenticatedBehavior) -> BTreeSet<View> {
    if !session.authenticated {
        return match behavior {
            UnauthenticatedBehavior::ShowLanding => BTreeSet::from([View::Landing]),
            // Eager login enables nothing; the host reacts to the empty set
            // by starting the login flow.
            UnauthenticatedBehavior::EagerLogin => BTreeSet::new(),
        };
    }

    let mut views = BTreeSet::new();
    if session.has_role(ROLE_CLIENT) {
        views.insert(View::Catalog);
        views.insert(View::OrderHistory);
        views.insert(View::CreateOrder);
    }
    if session.has_role(ROLE_ADMIN) {
        views.insert(View::Catalog);
        views.insert(View::Admin);
    }
    if views.is_empty() {
        views.insert(View::Landing);
    }
    views
}

/// Resolve a navigation request. Disabled views redirect to the default
/// authenticated view (the catalog) rather than erroring; without a catalog
/// the landing view is the fallback.
pub fn resolve(session: &Session, requested: View, behavior: UnauthenticatedBehavior) -> View {
    let permitted = permitted_views(session, behavior);
    if permitted.contains(&requested) {
        return requested;
    }
    if permitted.contains(&View::Catalog) {
        View::Catalog
    } else {
        View::Landing
    }
}
