use axum::extract::{Path, State};

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::models::{
    InstallExtension, SwitchExtension, UpdateCheckExtensionResp, UpdateExtensionSettings,
};
use crate::api::result::Envelope;
use crate::api::state::AppState;
use crate::extension::Extension;

/// POST /api/v1/extensions
///
/// `devMode` installs from a local folder, anything else is fetched from the
/// repository URL. Returns the installed identity.
pub async fn install_extension(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<InstallExtension>,
) -> Result<Envelope<String>, ApiError> {
    if body.url.trim().is_empty() {
        return Err(ApiError::param("url"));
    }

    let installed = if body.dev_mode {
        state.extensions.install_by_folder(&body.url).await?
    } else {
        state.extensions.install_by_git(&body.url).await?
    };

    state.metrics.extension_installed();

    Ok(Envelope::ok(installed.identity))
}

/// GET /api/v1/extensions
pub async fn get_extensions(State(state): State<AppState>) -> Envelope<Vec<Extension>> {
    Envelope::ok(state.extensions.list().await)
}

/// GET /api/v1/extensions/{identity}
pub async fn get_extension(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Envelope<Extension>, ApiError> {
    let extension = state.extensions.get(&identity).await?;
    Ok(Envelope::ok(extension))
}

/// PUT /api/v1/extensions/{identity}/settings
pub async fn update_extension_settings(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    ApiJson(body): ApiJson<UpdateExtensionSettings>,
) -> Result<Envelope<()>, ApiError> {
    state
        .extensions
        .update_settings(&identity, body.settings)
        .await?;
    Ok(Envelope::nil())
}

/// PUT /api/v1/extensions/{identity}/switch
pub async fn switch_extension(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    ApiJson(body): ApiJson<SwitchExtension>,
) -> Result<Envelope<()>, ApiError> {
    state.extensions.switch(&identity, body.status).await?;
    Ok(Envelope::nil())
}

/// DELETE /api/v1/extensions/{identity}
pub async fn delete_extension(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    state.extensions.delete(&identity).await?;
    Ok(Envelope::nil())
}

/// GET /api/v1/extensions/{identity}/update
pub async fn update_check_extension(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Envelope<UpdateCheckExtensionResp>, ApiError> {
    let new_version = state.extensions.upgrade_check(&identity).await?;
    Ok(Envelope::ok(UpdateCheckExtensionResp { new_version }))
}

/// POST /api/v1/extensions/{identity}/update
pub async fn update_extension(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    state.extensions.upgrade(&identity).await?;
    Ok(Envelope::nil())
}
