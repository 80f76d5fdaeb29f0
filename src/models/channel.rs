// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube channel identity and the advisory client-side session state.

use serde::{Deserialize, Serialize};

/// Channel identity returned by the channel endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
}

/// Last-known authentication state cached on the client side.
///
/// The HTTP-only session cookies held by the relay are authoritative;
/// this is only an advisory cache that avoids needless network calls.
/// `logged_in == true` must always be confirmed with a live call before
/// being trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub logged_in: bool,
    pub channel: Option<ChannelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_info_wire_format() {
        let json = r#"{"id":"UC123","title":"My Channel","thumbnailUrl":"https://example.com/t.png"}"#;
        let info: ChannelInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "UC123");
        assert_eq!(info.thumbnail_url, "https://example.com/t.png");

        let round_trip = serde_json::to_string(&info).unwrap();
        assert!(round_trip.contains("thumbnailUrl"));
    }

    #[test]
    fn test_session_state_default_logged_out() {
        let state = SessionState::default();
        assert!(!state.logged_in);
        assert!(state.channel.is_none());
    }
}
