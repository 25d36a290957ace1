//! Dialogue states and per-session transient state.

use serde::{Deserialize, Serialize};

/// The states of the order-taking conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    /// Entry gate: routes to consent, phone, address capture, or the menu.
    Authorization,
    ConsentProcessing,
    InputPhone,
    InputAddress,
    MainMenu,
    BuildingCake,
    InputInscription,
    CakeReady,
    OrderReview,
    ChangePhone,
    ChangeAddress,
    OrderDetails,
}

impl Default for DialogState {
    fn default() -> Self {
        Self::Authorization
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Authorization => "authorization",
            Self::ConsentProcessing => "consent_processing",
            Self::InputPhone => "input_phone",
            Self::InputAddress => "input_address",
            Self::MainMenu => "main_menu",
            Self::BuildingCake => "building_cake",
            Self::InputInscription => "input_inscription",
            Self::CakeReady => "cake_ready",
            Self::OrderReview => "order_review",
            Self::ChangePhone => "change_phone",
            Self::ChangeAddress => "change_address",
            Self::OrderDetails => "order_details",
        };
        write!(f, "{s}")
    }
}

/// Per-session transient state, looked up by chat identity on every event.
///
/// Everything a flow needs between two events lives here — never in
/// process-wide globals — so concurrent customers cannot cross-contaminate
/// each other's drafts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub state: DialogState,
    /// The open draft cake, while composing.
    pub draft_cake_id: Option<i64>,
    /// Index into the ordered category list, while composing.
    pub category_index: usize,
    /// The order under review, between placement and confirmation.
    pub current_order_id: Option<i64>,
}

impl SessionState {
    /// Drop all flow-transient references (draft, traversal cursor, pending
    /// order). The dialogue state itself is set by the caller.
    pub fn reset_flow(&mut self) {
        self.draft_cake_id = None;
        self.category_index = 0;
        self.current_order_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_starts_at_authorization() {
        let session = SessionState::default();
        assert_eq!(session.state, DialogState::Authorization);
        assert!(session.draft_cake_id.is_none());
        assert_eq!(session.category_index, 0);
        assert!(session.current_order_id.is_none());
    }

    #[test]
    fn reset_flow_clears_transients_only() {
        let mut session = SessionState {
            state: DialogState::BuildingCake,
            draft_cake_id: Some(7),
            category_index: 3,
            current_order_id: Some(11),
        };
        session.reset_flow();
        assert_eq!(session.state, DialogState::BuildingCake);
        assert!(session.draft_cake_id.is_none());
        assert_eq!(session.category_index, 0);
        assert!(session.current_order_id.is_none());
    }

    #[test]
    fn display_matches_serde() {
        for state in [
            DialogState::Authorization,
            DialogState::ConsentProcessing,
            DialogState::InputPhone,
            DialogState::InputAddress,
            DialogState::MainMenu,
            DialogState::BuildingCake,
            DialogState::InputInscription,
            DialogState::CakeReady,
            DialogState::OrderReview,
            DialogState::ChangePhone,
            DialogState::ChangeAddress,
            DialogState::OrderDetails,
        ] {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }
}
