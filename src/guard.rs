//! Role guards.
//!
//! Each guard is an [`Adapted`] handler meant to sit in front of a route's
//! real handler:
//!
//! ```rust
//! use http::Method;
//! use tsu_wrap::{Chain, Router, adapt, guard, Next, Request, Response};
//!
//! let list_users = adapt(|_req: Request, _res: Response, _next: Next| async { "[]" });
//! let app = Router::new()
//!     .on_chain(Method::GET, "/users", Chain::new().then(guard::only_admin()).then(list_users));
//! # let _ = app;
//! ```

use std::sync::Arc;

use crate::adapter::adapt;
use crate::auth::Role;
use crate::error::HandlerError;
use crate::handler::Adapted;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;

/// Lets the request through only if the principal holds one of `roles`.
///
/// - no roles configured: always continues
/// - no principal on the request: `401 Unauthorized`
/// - role not allowed: `403 Forbidden`, naming the requested URL
pub fn only_roles(roles: impl IntoIterator<Item = Role>) -> Adapted {
    let allowed: Arc<[Role]> = roles.into_iter().collect();
    adapt(move |req: Request, _res: Response, next: Next| {
        let verdict = check(&allowed, &req);
        async move {
            verdict?;
            next.run();
            Ok::<_, HandlerError>(())
        }
    })
}

/// Allows [`Role::Admin`] only.
pub fn only_admin() -> Adapted {
    only_roles([Role::Admin])
}

/// Allows [`Role::Admin`] and [`Role::Seller`].
pub fn admin_or_seller() -> Adapted {
    only_roles([Role::Admin, Role::Seller])
}

fn check(allowed: &[Role], req: &Request) -> Result<(), HandlerError> {
    if allowed.is_empty() {
        return Ok(());
    }

    let Some(principal) = req.principal() else {
        return Err(HandlerError::Unauthorized(format!(
            "authentication required to access {}",
            req.original_url()
        )));
    };

    if !allowed.contains(&principal.role) {
        return Err(HandlerError::Forbidden(format!(
            "user does not have permission to access {}",
            req.original_url()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::auth::Principal;
    use crate::next::Flow;

    fn request(uri: &str, role: Option<Role>) -> Request {
        let req: Request = http::Request::builder().uri(uri).body(Bytes::new()).unwrap().into();
        if let Some(role) = role {
            req.set_principal(Principal::new("u-1", role));
        }
        req
    }

    async fn run(guard: &Adapted, req: Request) -> Flow {
        let (next, settlement) = Next::channel();
        guard.call(req, Response::new(), next).await;
        settlement.flow().await
    }

    #[tokio::test]
    async fn no_roles_means_no_restriction() {
        let guard = only_roles([]);
        assert!(matches!(run(&guard, request("/", None)).await, Flow::Continue));
        assert!(matches!(run(&guard, request("/", Some(Role::Customer))).await, Flow::Continue));
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden_with_url() {
        let flow = run(&only_admin(), request("/admin/users?page=2", Some(Role::Seller))).await;
        match flow {
            Flow::Fail(err @ HandlerError::Forbidden(_)) => {
                assert!(err.to_string().contains("/admin/users?page=2"));
            }
            other => panic!("unexpected flow: {other:?}"),
        }
    }

    #[tokio::test]
    async fn allowed_role_continues() {
        let guard = admin_or_seller();
        assert!(matches!(run(&guard, request("/", Some(Role::Seller))).await, Flow::Continue));
        assert!(matches!(run(&guard, request("/", Some(Role::Admin))).await, Flow::Continue));
        assert!(matches!(
            run(&guard, request("/", Some(Role::Customer))).await,
            Flow::Fail(HandlerError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let flow = run(&only_admin(), request("/admin", None)).await;
        assert!(matches!(flow, Flow::Fail(HandlerError::Unauthorized(msg)) if msg.contains("/admin")));
    }
}
