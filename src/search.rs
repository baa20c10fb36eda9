use crate::api::UserRecord;
use crate::app::AppState;

/// Records whose name or username contains `query`, ignoring case, in
/// their original order. An empty query keeps everything.
pub fn filter_users(users: &[UserRecord], query: &str) -> Vec<UserRecord> {
    let q = query.to_lowercase();
    if q.is_empty() {
        return users.to_vec();
    }
    users
        .iter()
        .filter(|u| u.name.to_lowercase().contains(&q) || u.username.to_lowercase().contains(&q))
        .cloned()
        .collect()
}

/// Recompute the visible rows from the list and the current query.
pub fn apply_search(app: &mut AppState) {
    let selected_id = app.selected_user().map(|u| u.id);
    app.users = filter_users(app.list.users(), &app.search_query);
    app.selected_user_index = selected_id
        .and_then(|id| app.users.iter().position(|u| u.id == id))
        .unwrap_or(0)
        .min(app.users.len().saturating_sub(1));
}
