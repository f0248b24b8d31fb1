//! Recommendation selection over a finished working table.

use tracing::debug;

use crate::models::enums::Treatment;
use crate::models::records::SettingsRecord;

use super::table::{TrtDosing, WorkingTable};

/// Pick the recommended treatment: the first entry of the ordered preference
/// list that is on the table and not vetoed. None when every preference is
/// vetoed or absent; preference order is the only ranking signal, so there
/// is no fallback past the list.
pub fn select_recommendation<'a>(
    table: &'a WorkingTable,
    settings: &SettingsRecord,
) -> Option<(Treatment, &'a TrtDosing)> {
    for &preferred in settings.preferences() {
        if let Some(entry) = table.get(preferred) {
            if !entry.vetoed() {
                debug!(treatment = %preferred, "recommendation from preference list");
                return Some((preferred, entry));
            }
        }
    }
    debug!("no preferred treatment survived");
    None
}
