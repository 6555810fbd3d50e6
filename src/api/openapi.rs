use utoipa::OpenApi;

use crate::{
    api::models::{AccountView, ErrorResponse, HealthResponse},
    core::models::{AccountDraft, AccountPatch, User, UserDraft, UserPatch},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health,
        super::handlers::create_user,
        super::handlers::get_user,
        super::handlers::update_user,
        super::handlers::delete_user,
        super::handlers::create_account,
        super::handlers::get_account,
        super::handlers::update_account,
        super::handlers::deactivate_account
    ),
    components(schemas(
        User,
        UserDraft,
        UserPatch,
        AccountDraft,
        AccountPatch,
        AccountView,
        ErrorResponse,
        HealthResponse
    )),
    info(
        title = "Userkeep API",
        description = "API for creating, reading, updating and deleting users and accounts",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
