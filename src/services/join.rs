use tracing::{info, warn};
use validator::Validate;

use crate::{
    api::SessionApi,
    dao::{models::JoinPreference, preferences::Preferences},
    dto::participant::{JoinRequest, Participant},
    error::ClientError,
};

/// Join a session by code and remember the issued token.
///
/// The code is normalised to uppercase and both inputs are validated before any request.
pub async fn join_session(
    api: &dyn SessionApi,
    preferences: &Preferences,
    session_code: &str,
    display_name: &str,
    preference: Option<JoinPreference>,
) -> Result<Participant, ClientError> {
    let request = JoinRequest::new(session_code, display_name);
    request.validate()?;
    let code = request.session_code.clone();

    let response = api.join(request).await?;
    preferences.store_participant_token(&code, &response.participant_token)?;

    if let Some(preference) = preference {
        if let Err(err) = preferences.set_join_preference(&code, preference) {
            warn!(%code, error = %err, "failed to store join preference");
        }
    }

    info!(%code, participant_id = %response.participant.id, "joined session");
    Ok(response.participant)
}
