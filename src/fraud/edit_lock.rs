use crate::domain::{EditAfterLockFinding, Pick};

/// Non-admin edits stamped at or after game start
pub fn detect_edit_after_lock(pick: &Pick) -> EditAfterLockFinding {
    let post_lock_edits = pick
        .edits
        .iter()
        .filter(|edit| !edit.is_admin_edit && edit.edited_at >= pick.game_start_time)
        .count();

    EditAfterLockFinding {
        detected: post_lock_edits > 0,
        post_lock_edits,
    }
}
