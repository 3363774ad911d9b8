//! Pure selection rules for a user's avatar set.
//!
//! Everything here works on avatars already loaded in natural order
//! (`date_uploaded`, then `id`) so it can be exercised without a store.

use std::collections::HashSet;

use itertools::Itertools;

use crate::domain::models::{Avatar, AvatarDirectory, AvatarId};

/// Build the directory view for a user's avatars.
///
/// The current avatar is the one flagged primary. Should the flag be missing
/// the first avatar in natural order stands in, which mirrors a descending
/// sort on the flag with natural order as the tie-break.
pub fn resolve_directory(owned: &[Avatar], max_avatars: usize) -> AvatarDirectory {
    let primary = owned
        .iter()
        .find(|avatar| avatar.primary)
        .or_else(|| owned.first())
        .cloned();

    let avatars = if max_avatars <= 1 {
        primary.iter().cloned().collect()
    } else {
        owned.iter().take(max_avatars).cloned().collect()
    };

    AvatarDirectory { primary, avatars }
}

/// What a delete request will actually do once restricted to the user's own avatars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Ids to remove, deduplicated, all owned by the acting user.
    pub ids: Vec<AvatarId>,
    /// Whether the current primary is among `ids`.
    pub removes_primary: bool,
    /// Avatar promoted to primary before the deletion runs.
    pub replacement: Option<AvatarId>,
}

impl DeletionPlan {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Work out which avatars a delete request removes and who inherits the primary flag.
///
/// Requested ids outside the visible set are dropped, so a client can never
/// reach another user's rows. The replacement is the first avatar in natural
/// order that survives the deletion; when nothing survives there is none.
pub fn plan_deletion(
    owned: &[Avatar],
    directory: &AvatarDirectory,
    requested: &[AvatarId],
) -> DeletionPlan {
    let ids: Vec<AvatarId> = requested
        .iter()
        .copied()
        .unique()
        .filter(|id| directory.contains(*id))
        .collect();

    let doomed: HashSet<AvatarId> = ids.iter().copied().collect();
    let removes_primary = directory
        .primary
        .as_ref()
        .is_some_and(|primary| doomed.contains(&primary.id));

    let replacement = if removes_primary {
        owned
            .iter()
            .find(|avatar| !doomed.contains(&avatar.id))
            .map(|avatar| avatar.id)
    } else {
        None
    };

    DeletionPlan {
        ids,
        removes_primary,
        replacement,
    }
}
