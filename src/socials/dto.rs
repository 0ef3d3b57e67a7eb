use serde::Serialize;

use crate::users::Socials;

/// `data` of both socials endpoints.
#[derive(Debug, Serialize)]
pub struct SocialsData {
    pub socials: Socials,
}
