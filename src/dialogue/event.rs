//! Input classification — raw text to tagged events.
//!
//! The transport hands the engine plain text (typed or from a tapped reply
//! button). Classification happens exactly once, here, so state handlers
//! never match on presentation strings.

use crate::error::ParseError;

/// Button labels shared between the classifier and the reply builders.
pub mod labels {
    pub const ACCEPT_CONSENT: &str = "Accept the policy";
    pub const DECLINE_CONSENT: &str = "Decline";
    pub const BUILD_CAKE: &str = "Build a cake";
    pub const VIEW_ORDERS: &str = "Your orders";
    pub const SKIP: &str = "Skip";
    pub const RETURN_TO_MENU: &str = "Back to menu";
    pub const PLACE_ORDER: &str = "Place order";
    pub const CONFIRM_ORDER: &str = "Confirm order";
    pub const EDIT_PHONE: &str = "Change phone";
    pub const EDIT_ADDRESS: &str = "Change address";
    pub const CANCEL_ORDER: &str = "Cancel";
}

/// Marker prefixing an option id inside an option button label.
pub const OPTION_MARKER: char = '#';
/// Marker prefixing an order id inside an order button label.
pub const ORDER_MARKER: char = '№';

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    AcceptConsent,
    DeclineConsent,
    BuildCake,
    ViewOrders,
    SkipOption,
    ReturnToMenu,
    PlaceOrder,
    ConfirmOrder,
    EditPhone,
    EditAddress,
    CancelOrder,
    /// An option button: text carrying a `#id` marker.
    PickOption(i64),
    /// An order button: text carrying a `№id` marker.
    PickOrder(i64),
    /// Anything else — free text or an unrecognized button.
    Text(String),
}

/// Classify raw input text into an event.
///
/// Malformed `#`/`№` markers are a [`ParseError`] internally but surface as
/// `Text` — the engine treats them as "not understood" rather than failing
/// the transition.
pub fn classify(input: &str) -> InputEvent {
    let trimmed = input.trim();
    match trimmed {
        labels::ACCEPT_CONSENT => return InputEvent::AcceptConsent,
        labels::DECLINE_CONSENT => return InputEvent::DeclineConsent,
        labels::BUILD_CAKE => return InputEvent::BuildCake,
        labels::VIEW_ORDERS => return InputEvent::ViewOrders,
        labels::SKIP => return InputEvent::SkipOption,
        labels::RETURN_TO_MENU => return InputEvent::ReturnToMenu,
        labels::PLACE_ORDER => return InputEvent::PlaceOrder,
        labels::CONFIRM_ORDER => return InputEvent::ConfirmOrder,
        labels::EDIT_PHONE => return InputEvent::EditPhone,
        labels::EDIT_ADDRESS => return InputEvent::EditAddress,
        labels::CANCEL_ORDER => return InputEvent::CancelOrder,
        _ => {}
    }

    if trimmed.contains(OPTION_MARKER) {
        if let Ok(id) = parse_marked_id(trimmed, OPTION_MARKER) {
            return InputEvent::PickOption(id);
        }
    }
    if trimmed.contains(ORDER_MARKER) {
        if let Ok(id) = parse_marked_id(trimmed, ORDER_MARKER) {
            return InputEvent::PickOrder(id);
        }
    }

    InputEvent::Text(trimmed.to_string())
}

/// Extract the numeric id following `marker` from a button label such as
/// `"Two layers +750 #4"` or `"Order №12 — 750 (2026-08-01)"`.
pub fn parse_marked_id(input: &str, marker: char) -> Result<i64, ParseError> {
    let token = input
        .split_whitespace()
        .find(|word| word.contains(marker))
        .ok_or(ParseError::MissingMarker { marker })?;

    let marker_end = token
        .find(marker)
        .map(|idx| idx + marker.len_utf8())
        .ok_or(ParseError::MissingMarker { marker })?;

    token[marker_end..]
        .parse()
        .map_err(|_| ParseError::InvalidNumber {
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_classify_to_events() {
        let cases = [
            (labels::ACCEPT_CONSENT, InputEvent::AcceptConsent),
            (labels::DECLINE_CONSENT, InputEvent::DeclineConsent),
            (labels::BUILD_CAKE, InputEvent::BuildCake),
            (labels::VIEW_ORDERS, InputEvent::ViewOrders),
            (labels::SKIP, InputEvent::SkipOption),
            (labels::RETURN_TO_MENU, InputEvent::ReturnToMenu),
            (labels::PLACE_ORDER, InputEvent::PlaceOrder),
            (labels::CONFIRM_ORDER, InputEvent::ConfirmOrder),
            (labels::EDIT_PHONE, InputEvent::EditPhone),
            (labels::EDIT_ADDRESS, InputEvent::EditAddress),
            (labels::CANCEL_ORDER, InputEvent::CancelOrder),
        ];
        for (input, expected) in cases {
            assert_eq!(classify(input), expected, "input: {input}");
        }
    }

    #[test]
    fn option_marker_parses() {
        assert_eq!(classify("Two layers +750 #4"), InputEvent::PickOption(4));
        assert_eq!(classify("#17"), InputEvent::PickOption(17));
    }

    #[test]
    fn order_marker_parses() {
        assert_eq!(
            classify("Order №12 — 750 (2026-08-01)"),
            InputEvent::PickOrder(12)
        );
    }

    #[test]
    fn malformed_markers_fall_back_to_text() {
        assert_eq!(
            classify("price is #free"),
            InputEvent::Text("price is #free".into())
        );
        assert_eq!(classify("№nope"), InputEvent::Text("№nope".into()));
    }

    #[test]
    fn free_text_passes_through_trimmed() {
        assert_eq!(
            classify("  Arbat st. 1  "),
            InputEvent::Text("Arbat st. 1".into())
        );
    }

    #[test]
    fn parse_marked_id_errors() {
        assert!(matches!(
            parse_marked_id("no marker here", '#'),
            Err(ParseError::MissingMarker { marker: '#' })
        ));
        assert!(matches!(
            parse_marked_id("bad #x1", '#'),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn order_marker_is_multibyte_safe() {
        assert_eq!(parse_marked_id("№3", '№').unwrap(), 3);
    }
}
