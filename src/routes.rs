use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::account::{avatar::MAX_AVATAR_BYTES, handlers as account, Role};
use crate::catalog::handlers as catalog;
use crate::coaching::handlers as coaching;
use crate::order::handlers as order;
use crate::post::handlers as post;
use crate::review::handlers as review;
use crate::room::handlers as room;
use crate::search::handlers as search;
use crate::session::{self, require_principal, require_super_admin, RoleGate};
use crate::shared::AppState;

/// Multipart framing on top of the largest accepted avatar
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 1024 * 1024;

fn gate(state: &AppState, role: Role) -> RoleGate {
    RoleGate::new(state.clone(), role)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let any_admin = Router::new()
        .route("/check-login", get(session::check_login))
        .route("/packages", get(catalog::list_packages))
        .route("/package-categories", get(catalog::list_categories))
        .route("/all-rooms", get(room::list_rooms))
        .route("/get-room/:id", get(room::get_room))
        .route("/package-reviews", get(review::list_reviews))
        .route("/posts", get(post::list_posts))
        .route("/add-post", post(post::add_post))
        .route_layer(from_fn_with_state(gate(state, Role::Admin), require_principal));

    // Layers run bottom-up: the principal is attached before the level check
    let super_admin = Router::new()
        .route("/all-clients", get(account::list_clients))
        .route("/lock-open-customer/:id", put(account::lock_open_client))
        .route("/ban-customer/:id", put(account::ban_client))
        .route("/all-coaches", get(account::list_coaches))
        .route("/add-coach", post(account::add_coach))
        .route("/lock-open-coach/:id", put(account::lock_open_coach))
        .route("/ban-coach/:id", put(account::ban_coach))
        .route("/add-package", post(catalog::add_package))
        .route("/update-package/:id", put(catalog::update_package))
        .route("/change-status-package/:id", put(catalog::change_package_status))
        .route("/delete-package/:id", delete(catalog::delete_package))
        .route("/add-package-category", post(catalog::add_category))
        .route("/orders", get(order::list_orders))
        .route("/check-order/:id", put(order::check_order))
        .route("/cancel-order/:id", put(order::cancel_order))
        .route("/add-room", post(room::add_room))
        .route("/update-room/:id", put(room::update_room))
        .route("/delete-room/:id", delete(room::delete_room))
        .route("/lock-room/:id", put(room::lock_room))
        .route("/maintain-room/:id", put(room::maintain_room))
        .route("/unmaintain-room/:id", put(room::unmaintain_room))
        .route("/approve-review/:id", put(review::approve_review))
        .route("/reject-review/:id", put(review::reject_review))
        .route("/delete-post/:id", delete(post::delete_post))
        .route_layer(from_fn(require_super_admin))
        .route_layer(from_fn_with_state(gate(state, Role::Admin), require_principal));

    Router::new()
        .route("/login", post(session::login_admin))
        .merge(any_admin)
        .merge(super_admin)
}

fn client_routes(state: &AppState) -> Router<AppState> {
    let avatar = Router::new()
        .route("/update-avatar", put(account::update_avatar))
        .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT));

    let protected = Router::new()
        .route("/check-login", get(session::check_login))
        .route("/my-profile", get(account::my_profile))
        .route("/update-profile", put(account::update_profile))
        .merge(avatar)
        .route("/packages", get(catalog::list_packages))
        .route("/package-categories", get(catalog::list_categories))
        .route("/order", post(order::place_order))
        .route("/orders", get(order::my_orders))
        .route("/all-coaches", get(account::browse_coaches))
        .route("/book-coach/:id", post(coaching::book_coach))
        .route("/my-schedules", get(coaching::client_schedules))
        .route("/all-rooms", get(room::list_rooms))
        .route("/get-room/:id", get(room::get_room))
        .route("/review-package", post(review::review_package))
        .route("/check-review/:id", get(review::check_review))
        .route("/all-post", get(post::published_posts))
        .route("/search", post(search::search))
        .route_layer(from_fn_with_state(gate(state, Role::Client), require_principal));

    Router::new()
        .route("/login", post(session::login_client))
        .route("/register", post(account::register_client))
        .merge(protected)
}

fn coach_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/check-login", get(session::check_login))
        .route("/my-students", get(coaching::my_students))
        .route("/add-schedule", post(coaching::add_schedule))
        .route("/delete-schedule/:id", delete(coaching::delete_schedule))
        .route("/my-schedules", get(coaching::coach_schedules))
        .route_layer(from_fn_with_state(gate(state, Role::Coach), require_principal));

    Router::new()
        .route("/login", post(session::login_coach))
        .merge(protected)
}

async fn health() -> &'static str {
    "Gym management API is running"
}

/// Builds the full application router
pub fn app(state: AppState) -> Router {
    let images = ServeDir::new(state.avatar_store.images_dir());

    Router::new()
        .route("/", get(health))
        .nest("/api/admin", admin_routes(&state))
        .nest("/api/client", client_routes(&state))
        .nest("/api/coach", coach_routes(&state))
        .nest_service("/images", images)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
