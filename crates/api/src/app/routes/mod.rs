use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod auth;
pub mod company;
pub mod roles;
pub mod system;
pub mod users;

/// Endpoints reachable without a session (nested under `/api/users`).
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/perform-reset", post(auth::perform_reset))
}

/// Endpoints that need a verified session (nested under `/api/users`).
pub fn protected_router() -> Router {
    Router::new()
        .route("/me", get(users::me))
        .route("/me/permissions/:name", get(users::check_permission))
        .route("/profile", get(users::profile))
        .route("/invite", post(users::invite))
        .route("/reset-password", post(auth::change_password))
        .route("/create-company", post(company::create_company))
        .route("/workspace-users", get(users::workspace_users))
        .route("/roles", post(roles::create_role).get(roles::list_roles))
        .route("/roles/:id", delete(roles::delete_role))
        .route("/:id", put(users::update_user).delete(users::delete_user))
        .route("/:id/assign-role", post(users::assign_role))
}
