use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Deserialize;

use vidacomdeus_common::Theme;

use crate::auth::AuthUser;
use crate::db::models::user::{SettingsPatch, User, UserProfile, UserSettings};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::ApiJson;

const USER_NOT_FOUND: &str = "Usuário não encontrado";

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub ai_insights: Option<bool>,
    pub biblical_reminders: Option<bool>,
    pub rag_memory: Option<bool>,
}

impl SettingsUpdate {
    fn into_patch(self) -> Result<SettingsPatch, String> {
        let theme = match self.theme {
            Some(raw) => Some(
                raw.parse::<Theme>()
                    .map_err(|_| format!("Tema inválido: {raw}. Use system, light ou dark."))?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };
        Ok(SettingsPatch {
            theme,
            ai_insights: self.ai_insights,
            biblical_reminders: self.biblical_reminders,
            rag_memory: self.rag_memory,
        })
    }
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let found = User::find_by_id(user.user_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(Json(found.into()))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    let name = update.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(ApiError::validation("O nome não pode estar vazio."));
    }

    let updated = User::update_profile(user.user_id, name, update.avatar_url.as_deref(), &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(Json(updated.into()))
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<UserSettings>> {
    Ok(Json(UserSettings::get_or_create(user.user_id, &state.pool).await?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(update): ApiJson<SettingsUpdate>,
) -> ApiResult<Json<UserSettings>> {
    let patch = update.into_patch().map_err(ApiError::Validation)?;
    Ok(Json(UserSettings::update(user.user_id, &patch, &state.pool).await?))
}
