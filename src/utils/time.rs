use crate::models::message::ServerTimestamp;

/// Human-readable receipt time, `N/A` while the store has not assigned one.
pub fn format_received(ts: Option<ServerTimestamp>) -> String {
    ts.and_then(ServerTimestamp::to_datetime)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
