//! Outbound replies — message text plus suggested reply labels.
//!
//! Rendering is transport-specific: Telegram turns suggestions into a reply
//! keyboard, the CLI prints them as hints. An empty suggestion list asks the
//! transport to clear any previous keyboard.

use std::path::{Path, PathBuf};

use crate::catalog::{CatalogOption, CategoryWithOptions};
use crate::dialogue::event::labels;
use crate::orders::Order;
use crate::profile::Customer;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub text: String,
    /// Suggested reply labels, one per row.
    pub suggestions: Vec<String>,
    /// A file to deliver alongside the text (the policy document).
    pub document: Option<PathBuf>,
}

impl OutgoingReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            suggestions: Vec::new(),
            document: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_document(mut self, path: &Path) -> Self {
        self.document = Some(path.to_path_buf());
        self
    }
}

// ── Label formats ───────────────────────────────────────────────────

/// Option button label; the `#id` marker is what the classifier parses back.
pub fn option_label(option: &CatalogOption) -> String {
    format!("{} +{} #{}", option.name, option.price, option.id)
}

/// Order button label; the `№id` marker is what the classifier parses back.
pub fn order_label(order: &Order) -> String {
    format!(
        "Order №{} — {} ({})",
        order.id,
        order.total,
        order.created_at.format("%Y-%m-%d")
    )
}

// ── Prompts ─────────────────────────────────────────────────────────

pub fn greeting(first_name: &str) -> OutgoingReply {
    OutgoingReply::text(format!("Hi, {first_name}!"))
}

pub fn consent_request(policy_document: &Path) -> OutgoingReply {
    OutgoingReply::text("Please consent to the processing of your personal data.")
        .with_suggestions(vec![
            labels::ACCEPT_CONSENT.to_string(),
            labels::DECLINE_CONSENT.to_string(),
        ])
        .with_document(policy_document)
}

pub fn consent_recorded() -> OutgoingReply {
    OutgoingReply::text("Thank you, your consent has been recorded.")
}

pub fn consent_declined() -> OutgoingReply {
    OutgoingReply::text("We cannot take orders without consent.")
}

pub fn phone_request() -> OutgoingReply {
    OutgoingReply::text("Please send your phone number.")
}

pub fn phone_invalid() -> OutgoingReply {
    OutgoingReply::text("That doesn't look like a valid phone number. Please try again.")
}

pub fn phone_saved(phone: &str) -> OutgoingReply {
    OutgoingReply::text(format!("Contact phone added to your profile: {phone}"))
}

pub fn address_request() -> OutgoingReply {
    OutgoingReply::text("Please send your delivery address.")
}

pub fn address_saved(address: &str) -> OutgoingReply {
    OutgoingReply::text(format!("Delivery address added to your profile: {address}"))
}

pub fn main_menu(show_orders: bool) -> OutgoingReply {
    let mut suggestions = vec![labels::BUILD_CAKE.to_string()];
    if show_orders {
        suggestions.push(labels::VIEW_ORDERS.to_string());
    }
    OutgoingReply::text("Pick an action.").with_suggestions(suggestions)
}

pub fn category_prompt(category: &CategoryWithOptions) -> OutgoingReply {
    let mut suggestions = Vec::with_capacity(category.options.len() + 2);
    if !category.category.is_mandatory {
        suggestions.push(labels::SKIP.to_string());
    }
    for option in &category.options {
        suggestions.push(option_label(option));
    }
    suggestions.push(labels::RETURN_TO_MENU.to_string());

    OutgoingReply::text(format!("Pick a \"{}\" option.", category.category.title))
        .with_suggestions(suggestions)
}

pub fn mandatory_choice_required(category_title: &str) -> OutgoingReply {
    OutgoingReply::text(format!(
        "A \"{category_title}\" choice is required for this cake."
    ))
}

pub fn inscription_request() -> OutgoingReply {
    OutgoingReply::text("What should the inscription say?")
        .with_suggestions(vec![labels::RETURN_TO_MENU.to_string()])
}

pub fn cake_ready(price: i64) -> OutgoingReply {
    OutgoingReply::text(format!("Your cake is ready! Total: {price}.")).with_suggestions(vec![
        labels::PLACE_ORDER.to_string(),
        labels::RETURN_TO_MENU.to_string(),
    ])
}

pub fn order_summary(order: &Order, customer: &Customer, cake_count: i64) -> OutgoingReply {
    OutgoingReply::text(format!(
        "Order №{}\n\
         Status: {}\n\
         \n\
         Cakes in the order: {}\n\
         Order total: {}\n\
         \n\
         Recipient: {}\n\
         Phone: {}\n\
         Delivery address: {}",
        order.id,
        order.status.label(),
        cake_count,
        order.total,
        customer.display_name(),
        customer.phone.as_deref().unwrap_or("—"),
        customer.address.as_deref().unwrap_or("—"),
    ))
}

pub fn order_review_prompt() -> OutgoingReply {
    OutgoingReply::text("Check your order.").with_suggestions(vec![
        labels::CONFIRM_ORDER.to_string(),
        labels::EDIT_PHONE.to_string(),
        labels::EDIT_ADDRESS.to_string(),
        labels::CANCEL_ORDER.to_string(),
    ])
}

pub fn order_confirmed(order_id: i64) -> OutgoingReply {
    OutgoingReply::text(format!("Order №{order_id} confirmed."))
}

pub fn order_cancelled() -> OutgoingReply {
    OutgoingReply::text("The order has been cancelled. Come back soon!")
}

pub fn orders_list(orders: &[Order]) -> OutgoingReply {
    let mut suggestions: Vec<String> = orders.iter().map(order_label).collect();
    suggestions.push(labels::RETURN_TO_MENU.to_string());
    OutgoingReply::text("Pick an order to view.").with_suggestions(suggestions)
}

pub fn no_orders_yet() -> OutgoingReply {
    OutgoingReply::text("You have no orders yet.")
}

pub fn catalog_empty() -> OutgoingReply {
    OutgoingReply::text("The cake catalog is empty right now. Please come back later.")
}

pub fn not_understood() -> OutgoingReply {
    OutgoingReply::text("Sorry, I didn't understand that.")
}

pub fn something_went_wrong() -> OutgoingReply {
    OutgoingReply::text("Something went wrong — that item is no longer available.")
}
