//! Route table and navigation guard.
//!
//! Routes are path patterns with `:param` segments, optionally nested. A
//! navigation target resolves to the chain of routes it passes through,
//! outermost first, and the [`RouteGuard`] refuses targets whose chain
//! contains a route marked `requires_auth` unless the current
//! [`AuthSnapshot`] is authorized.

use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::state::AuthSnapshot;

/// Where unauthorized navigations are sent.
const ROOT_PATH: &str = "/";

/// Metadata attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Only authorized users may enter.
    pub requires_auth: bool,
}

/// A route pattern with optional children.
///
/// Child patterns are relative to their parent: a child `run` under
/// `/tests/:id` matches `/tests/:id/run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
    name: String,
    meta: RouteMeta,
    children: Vec<Route>,
}

impl Route {
    /// Create a route that anyone may enter.
    pub fn new(pattern: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            name: name.into(),
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    /// Mark the route (and so everything nested in it) as protected.
    pub fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    /// Nest a child route.
    pub fn child(mut self, route: Route) -> Self {
        self.children.push(route);
        self
    }

    /// The path pattern, relative to the parent route if nested.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The route metadata.
    pub fn meta(&self) -> &RouteMeta {
        &self.meta
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        split_segments(&self.pattern)
    }
}

/// One route in a resolved chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub name: String,
    pub pattern: String,
    pub meta: RouteMeta,
}

/// A navigation target resolved against a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The path that was resolved, without query or fragment.
    pub path: String,
    /// Matched routes, outermost first. The last entry is the leaf.
    pub matched: Vec<MatchedRoute>,
    /// Values captured by `:param` segments.
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    /// The innermost matched route.
    pub fn leaf(&self) -> Option<&MatchedRoute> {
        self.matched.last()
    }

    /// True if any route in the chain is protected.
    pub fn requires_auth(&self) -> bool {
        self.matched.iter().any(|r| r.meta.requires_auth)
    }

    /// A captured parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// An ordered set of routes. The first route that matches wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create a table from routes in match order.
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The routes of the mindrecord web client.
    pub fn application() -> Self {
        Self::new(vec![
            Route::new("/", "home"),
            Route::new("/tests/:id", "test"),
            Route::new("/tests/:id/run", "test-run"),
            Route::new("/tests/:id/results/:rid", "test-results"),
            Route::new("/playlist/:id", "playlist"),
            Route::new("/profile/:id", "profile").requires_auth(),
            Route::new("/error/", "error"),
            Route::new("/error/:code", "error"),
        ])
    }

    /// Resolve `target` to a route chain. Query strings and fragments are
    /// ignored.
    pub fn resolve(&self, target: &str) -> Option<RouteMatch> {
        let path = target
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string();
        let segments: Vec<&str> = split_segments(&path).collect();

        self.routes.iter().find_map(|route| {
            let mut chain = Vec::new();
            let mut params = BTreeMap::new();
            match_route(route, &segments, &mut chain, &mut params).then(|| RouteMatch {
                path: path.clone(),
                matched: chain,
                params,
            })
        })
    }
}

/// Outcome of [`RouteGuard::before_each`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Enter the target. `None` if no route matched, which is never guarded.
    Proceed(Option<RouteMatch>),
    /// The original navigation is dropped in favour of `to`.
    Redirect { to: String },
}

/// Checks each navigation against the route table and the current
/// authorization state.
///
/// The guard reads the latest committed [`AuthSnapshot`]; it does not look at
/// storage, so a token that expired after login is not caught here.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    state: watch::Receiver<AuthSnapshot>,
}

impl RouteGuard {
    /// Create a guard over `routes`, reading state from an
    /// [`AppState::subscribe`](crate::AppState::subscribe) receiver.
    pub fn new(routes: RouteTable, state: watch::Receiver<AuthSnapshot>) -> Self {
        Self { routes, state }
    }

    /// Decide whether navigation to `target` may proceed.
    pub fn before_each(&self, target: &str) -> Navigation {
        let resolved = self.routes.resolve(target);

        let protected = resolved.as_ref().is_some_and(RouteMatch::requires_auth);
        if !protected {
            debug!(target, "Navigation allowed");
            return Navigation::Proceed(resolved);
        }

        if self.state.borrow().is_authorized {
            debug!(target, "Navigation to protected route allowed");
            return Navigation::Proceed(resolved);
        }

        info!(target, "Unauthorized navigation redirected");
        Navigation::Redirect {
            to: ROOT_PATH.to_string(),
        }
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Match `route` (and its children) against `segments`, appending the
/// chain and captures on success. On failure nothing is appended.
fn match_route(
    route: &Route,
    segments: &[&str],
    chain: &mut Vec<MatchedRoute>,
    params: &mut BTreeMap<String, String>,
) -> bool {
    let pattern: Vec<&str> = route.segments().collect();
    if pattern.len() > segments.len() {
        return false;
    }

    let mut captured = Vec::new();
    for (expected, actual) in pattern.iter().zip(segments) {
        match expected.strip_prefix(':') {
            Some(name) => captured.push((name.to_string(), (*actual).to_string())),
            None if expected == actual => {}
            None => return false,
        }
    }

    let rest = &segments[pattern.len()..];
    let entry = MatchedRoute {
        name: route.name.clone(),
        pattern: route.pattern.clone(),
        meta: route.meta.clone(),
    };

    if rest.is_empty() {
        chain.push(entry);
        params.extend(captured);
        return true;
    }

    let mut child_chain = Vec::new();
    let mut child_params = BTreeMap::new();
    let matched_child = route
        .children
        .iter()
        .any(|child| match_route(child, rest, &mut child_chain, &mut child_params));

    if !matched_child {
        return false;
    }

    chain.push(entry);
    chain.extend(child_chain);
    params.extend(captured);
    params.extend(child_params);
    true
}
