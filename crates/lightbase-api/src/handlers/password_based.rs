//! Password provider handlers.

use axum::Json;
use axum::extract::State;

use lightbase_core::config::feature_flag::REDUCE_ERROR_KEY_INFO_FLAG;
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_auth::providers::password::PasswordLoginOutcome;
use lightbase_auth::providers::{determine_session_data, finalize_login};
use lightbase_entity::login::LoginType;
use lightbase_entity::session::{SessionData, SessionType, TokenPair, TwoStepType};
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::{
    ForgotPasswordRequest, PasswordLoginRequest, ResetPasswordRequest, UpdateEmailRequest,
    UpdatePasswordRequest, VerifyEmailRequest, VerifyOtpRequest,
};
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::{AuthSession, OptionalAuthSession, TenantContext};
use crate::state::AppState;

/// `POST /auth/password-based/login`
pub async fn login(
    State(state): State<AppState>,
    tenant: TenantContext,
    OptionalAuthSession(existing): OptionalAuthSession,
    Json(body): Json<PasswordLoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let reduce_error_info = state
        .feature_flags
        .get_dynamic(REDUCE_ERROR_KEY_INFO_FLAG, &tenant.tenant.name)
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;

    let (user_id, outcome) = state
        .password_provider
        .login(
            &mut *tx,
            &tenant.tenant,
            &body.email,
            &body.password,
            reduce_error_info,
        )
        .await?;

    // A previously anonymous visitor logging in on top of their session may
    // be folded into the account they authenticated as.
    if let Some(loaded) = &existing {
        state
            .user_directory
            .combine_users(&mut *tx, loaded.data.user_id, user_id)
            .await?;
    }

    let data = match outcome {
        PasswordLoginOutcome::Authenticated => {
            determine_session_data(&state.totp_provider, user_id, LoginType::PasswordBased).await?
        }
        PasswordLoginOutcome::RequiresOtp => SessionData::check_two_step(
            user_id,
            LoginType::PasswordBased,
            TwoStepType::PasswordBasedOtp,
        ),
        PasswordLoginOutcome::RequiresPasswordUpdate => SessionData {
            user_id,
            login_type: LoginType::PasswordBased,
            session_type: SessionType::PasswordBasedUpdatePassword,
            two_step_type: None,
            impersonator_user_id: None,
        },
    };

    let result = finalize_login(
        &state.session_store,
        &mut *tx,
        existing.as_ref(),
        data,
        body.device.as_ref(),
    )
    .await?;

    tx.commit().await.map_err(tx_err)?;
    Ok(Json(result.tokens))
}

/// `POST /auth/password-based/verify-otp` — second factor of an email-OTP
/// login; promotes the session to `user`.
pub async fn verify_otp(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<VerifyOtpRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if auth.data.session_type != SessionType::CheckTwoStep
        || auth.data.two_step_type != Some(TwoStepType::PasswordBasedOtp)
    {
        return Err(AppError::unauthorized("authPasswordBased.verifyOtp.invalidSession"));
    }

    state
        .password_provider
        .verify_otp(auth.data.user_id, &body.otp)
        .await?;

    let mut promoted = auth.data.clone();
    promoted.session_type = SessionType::User;
    promoted.two_step_type = None;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .session_store
        .update_data(&mut *tx, auth.session.id, &promoted)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/password-based/verify-email`
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .password_provider
        .verify_email(&mut *tx, &body.reset_token)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/password-based/forgot-password`
pub async fn forgot_password(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<ForgotPasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let reduce_error_info = state
        .feature_flags
        .get_dynamic(REDUCE_ERROR_KEY_INFO_FLAG, &tenant.tenant.name)
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .password_provider
        .forgot_password(&mut *tx, &tenant.tenant, &body.email, reduce_error_info)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/password-based/reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .password_provider
        .reset_password(&mut *tx, &body.reset_token, &body.password)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/password-based/list-emails`
pub async fn list_emails(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authPasswordBased.listEmails")
                .with_login_type(LoginType::PasswordBased),
        )
        .await?;

    let emails: Vec<String> = user
        .password_login
        .iter()
        .map(|login| login.email.clone())
        .collect();

    Ok(Json(serde_json::json!({ "emails": emails })))
}

/// `POST /auth/password-based/update-email` — also clears verification and
/// every session of the user.
pub async fn update_email(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<UpdateEmailRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authPasswordBased.updateEmail")
                .with_login_type(LoginType::PasswordBased),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .password_provider
        .update_email(&mut *tx, user.user.id, &body.email)
        .await?;
    state.user_directory.check_unique(&mut *tx, user.user.id).await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/password-based/update-password`
///
/// Also reachable from the forced-rotation state
/// (`passwordBasedUpdatePassword`), which can only call this endpoint.
pub async fn update_password(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<UpdatePasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if !matches!(
        auth.data.session_type,
        SessionType::User | SessionType::PasswordBasedUpdatePassword
    ) {
        return Err(AppError::unauthorized(
            "authPasswordBased.updatePassword.incorrectSessionType",
        ));
    }

    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authPasswordBased.updatePassword")
                .with_login_type(LoginType::PasswordBased)
                .skip_session_is_user_check(),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .password_provider
        .update_password(&mut *tx, user.user.id, &body.password, auth.session.id)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
