use anyhow::Context;
use tracing::{error, info, warn};

use crate::auth::{
    error::AuthError,
    repo_types::{NewUser, User},
    validation::{ValidLogin, ValidRegistration},
};
use crate::state::AppState;

/// Hashes the password off the async workers and stores the new user.
///
/// The lookup only saves hashing work for obvious duplicates; concurrent
/// registrations are settled by the store's uniqueness check on insert.
pub async fn register_user(state: &AppState, input: ValidRegistration) -> Result<User, AuthError> {
    if state.users.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let credentials = state.credentials.clone();
    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || credentials.enroll(&password))
        .await
        .context("password hashing task")??;

    let user = state
        .users
        .insert(NewUser {
            email: input.email,
            username: input.username,
            password_hash,
            is_admin: input.is_admin,
        })
        .await
        .map_err(|e| {
            let e = AuthError::from(e);
            if matches!(e, AuthError::DuplicateEmail) {
                warn!("email registered concurrently");
            }
            e
        })?;

    info!(user_id = %user.id, email = %user.email, is_admin = user.is_admin, "user registered");
    Ok(user)
}

/// Checks the credential. Unknown email and wrong password fail identically,
/// and an unknown email still pays for one full verification.
pub async fn authenticate(state: &AppState, input: ValidLogin) -> Result<User, AuthError> {
    let found = state.users.find_by_email(&input.email).await?;

    let credentials = state.credentials.clone();
    let password = input.password;
    let (found, outcome, stale) = tokio::task::spawn_blocking(move || match found {
        Some(user) => {
            let outcome = credentials.try_verify(&password, &user.password_hash);
            if outcome.is_err() {
                credentials.verify_decoy(&password);
            }
            let stale =
                matches!(outcome, Ok(true)) && credentials.needs_rehash(&user.password_hash);
            (Some(user), outcome, stale)
        }
        None => (None, Ok(credentials.verify_decoy(&password)), false),
    })
    .await
    .context("password verification task")?;

    let Some(user) = found else {
        warn!(email = %input.email, "login unknown email");
        return Err(AuthError::AuthenticationFailure);
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::AuthenticationFailure);
        }
        Err(e) => {
            error!(user_id = %user.id, error = %e, "stored password hash unusable");
            return Err(e.into());
        }
    }

    if stale {
        info!(user_id = %user.id, "stored password hash uses an outdated work factor");
    }
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}
