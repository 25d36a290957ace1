//! DialogueEngine — per-state handlers and transition rules.
//!
//! The engine owns the session map and the collaborator seams. Every inbound
//! event resolves to a next state and a list of outbound replies; no error
//! escapes to the transport as a fault.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cake::CakeBuilder;
use crate::catalog::{Catalog, CatalogOption, CategoryWithOptions};
use crate::dialogue::event::{classify, InputEvent};
use crate::dialogue::reply::{self, OutgoingReply};
use crate::dialogue::sessions::SessionMap;
use crate::dialogue::state::{DialogState, SessionState};
use crate::error::{BuilderError, DatabaseError, Error, OrderError, Result};
use crate::orders::OrderLedger;
use crate::phone::validate_phone;
use crate::profile::{Consent, Customer, ProfileStore};
use crate::store::Database;

/// Category title that triggers the inscription step when one of its options
/// is chosen.
const INSCRIPTION_CATEGORY: &str = "inscription";

/// Next state plus the replies to deliver.
pub type Outcome = (DialogState, Vec<OutgoingReply>);

pub struct DialogueEngine {
    db: Arc<dyn Database>,
    profiles: ProfileStore,
    catalog: Catalog,
    builder: CakeBuilder,
    ledger: OrderLedger,
    sessions: SessionMap,
    policy_document: PathBuf,
}

impl DialogueEngine {
    pub fn new(db: Arc<dyn Database>, policy_document: PathBuf) -> Self {
        Self {
            profiles: ProfileStore::new(Arc::clone(&db)),
            catalog: Catalog::new(Arc::clone(&db)),
            builder: CakeBuilder::new(Arc::clone(&db)),
            ledger: OrderLedger::new(Arc::clone(&db)),
            sessions: SessionMap::new(),
            db,
            policy_document,
        }
    }

    /// Session initiation: greet the customer and run the authorization gate.
    ///
    /// Any half-finished flow from a previous conversation is discarded.
    pub async fn handle_start(
        &self,
        chat_id: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Outcome {
        let mut session = self.sessions.acquire(chat_id).await;

        if let Some(draft_id) = session.draft_cake_id {
            if let Err(e) = self.builder.discard(draft_id).await {
                warn!(chat_id, draft_id, error = %e, "Failed to discard stale draft");
            }
        }
        session.reset_flow();

        let result = async {
            let customer = self
                .profiles
                .get_or_create(chat_id, first_name, last_name)
                .await?;
            let (state, mut replies) = self.resolve_authorization(&customer).await?;
            replies.insert(0, reply::greeting(&customer.first_name));
            Ok::<Outcome, Error>((state, replies))
        }
        .await;

        match result {
            Ok((state, replies)) => {
                session.state = state;
                (state, replies)
            }
            Err(e) => self.recover(&mut session, chat_id, e).await,
        }
    }

    /// The single entry point for inbound text events.
    ///
    /// Classifies the input, dispatches to the current state's handler, and
    /// applies the global error-recovery rules.
    pub async fn handle_event(&self, chat_id: &str, text: &str) -> Outcome {
        let mut session = self.sessions.acquire(chat_id).await;
        let event = classify(text);
        info!(chat_id, state = %session.state, ?event, "Handling event");

        let customer = match self.profiles.get(chat_id).await {
            Ok(customer) => customer,
            Err(DatabaseError::NotFound { .. }) => {
                // No /start yet; nothing to mutate.
                return (
                    session.state,
                    vec![OutgoingReply::text("Send /start to begin.")],
                );
            }
            Err(e) => return self.recover(&mut session, chat_id, e.into()).await,
        };

        let result = self
            .dispatch(&mut session, &customer, &event, text)
            .await;

        match result {
            Ok((state, replies)) => {
                session.state = state;
                (state, replies)
            }
            Err(e) => self.recover(&mut session, chat_id, e).await,
        }
    }

    async fn dispatch(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
        raw: &str,
    ) -> Result<Outcome> {
        match session.state {
            DialogState::Authorization => self.resolve_authorization(customer).await,
            DialogState::ConsentProcessing => self.on_consent(customer, event).await,
            DialogState::InputPhone => self.on_input_phone(customer, raw).await,
            DialogState::InputAddress => self.on_input_address(customer, raw).await,
            DialogState::MainMenu => self.on_main_menu(session, customer, event).await,
            DialogState::BuildingCake => self.on_building(session, customer, event).await,
            DialogState::InputInscription => self.on_inscription(session, customer, event, raw).await,
            DialogState::CakeReady => self.on_cake_ready(session, customer, event).await,
            DialogState::OrderReview => self.on_order_review(session, customer, event).await,
            DialogState::ChangePhone => self.on_change_phone(session, customer, raw).await,
            DialogState::ChangeAddress => self.on_change_address(session, customer, raw).await,
            DialogState::OrderDetails => self.on_order_details(session, customer, event).await,
        }
    }

    /// Global recovery: a stale id aborts to the main menu; anything else
    /// keeps the state and apologizes. A single session's fault never
    /// reaches the transport.
    async fn recover(&self, session: &mut SessionState, chat_id: &str, error: Error) -> Outcome {
        if error.is_not_found() {
            warn!(chat_id, error = %error, "Stale reference; returning to main menu");
            if let Some(draft_id) = session.draft_cake_id {
                let _ = self.builder.discard(draft_id).await;
            }
            session.reset_flow();
            session.state = DialogState::MainMenu;
            let menu = self
                .menu_reply(chat_id)
                .await
                .unwrap_or_else(|_| reply::main_menu(false));
            return (
                DialogState::MainMenu,
                vec![reply::something_went_wrong(), menu],
            );
        }

        warn!(chat_id, error = %error, "Transition failed; state unchanged");
        (
            session.state,
            vec![OutgoingReply::text(
                "Something went wrong, please try again.",
            )],
        )
    }

    // ── Authorization gate ──────────────────────────────────────────

    /// Resolve where an authorized-or-not customer lands: consent first,
    /// then phone, then address, then the main menu. A plain decision
    /// chain — each capture step re-enters here after persisting.
    async fn resolve_authorization(&self, customer: &Customer) -> Result<Outcome> {
        if customer.consent != Consent::Granted {
            return Ok((
                DialogState::ConsentProcessing,
                vec![reply::consent_request(&self.policy_document)],
            ));
        }
        if customer.phone.is_none() {
            return Ok((DialogState::InputPhone, vec![reply::phone_request()]));
        }
        if customer.address.is_none() {
            return Ok((DialogState::InputAddress, vec![reply::address_request()]));
        }
        Ok((
            DialogState::MainMenu,
            vec![self.menu_reply(&customer.chat_id).await?],
        ))
    }

    async fn menu_reply(&self, chat_id: &str) -> Result<OutgoingReply> {
        let has_orders = self.db.customer_has_orders(chat_id).await?;
        Ok(reply::main_menu(has_orders))
    }

    // ── State handlers ──────────────────────────────────────────────

    async fn on_consent(&self, customer: &Customer, event: &InputEvent) -> Result<Outcome> {
        let granted = match event {
            InputEvent::AcceptConsent => true,
            InputEvent::DeclineConsent => false,
            _ => {
                return Ok((
                    DialogState::ConsentProcessing,
                    vec![reply::not_understood()],
                ));
            }
        };

        let consent = if granted {
            Consent::Granted
        } else {
            Consent::Declined
        };
        self.profiles.set_consent(&customer.chat_id, consent).await?;
        info!(chat_id = %customer.chat_id, ?consent, "Recorded consent");

        let ack = if granted {
            reply::consent_recorded()
        } else {
            reply::consent_declined()
        };

        // Re-run the gate; a declined consent loops back to the prompt.
        let refreshed = self.profiles.get(&customer.chat_id).await?;
        let (state, mut replies) = self.resolve_authorization(&refreshed).await?;
        replies.insert(0, ack);
        Ok((state, replies))
    }

    async fn on_input_phone(&self, customer: &Customer, raw: &str) -> Result<Outcome> {
        let phone = match validate_phone(raw) {
            Ok(phone) => phone,
            Err(_) => return Ok((DialogState::InputPhone, vec![reply::phone_invalid()])),
        };

        self.profiles.set_phone(&customer.chat_id, &phone).await?;
        let refreshed = self.profiles.get(&customer.chat_id).await?;
        let (state, mut replies) = self.resolve_authorization(&refreshed).await?;
        replies.insert(0, reply::phone_saved(&phone));
        Ok((state, replies))
    }

    async fn on_input_address(&self, customer: &Customer, raw: &str) -> Result<Outcome> {
        // Persisted verbatim; no format validation.
        self.profiles.set_address(&customer.chat_id, raw).await?;
        let refreshed = self.profiles.get(&customer.chat_id).await?;
        let (state, mut replies) = self.resolve_authorization(&refreshed).await?;
        replies.insert(0, reply::address_saved(raw));
        Ok((state, replies))
    }

    async fn on_main_menu(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
    ) -> Result<Outcome> {
        match event {
            InputEvent::BuildCake => {
                let categories = self.catalog.load_ordered_categories().await?;
                let Some(first) = categories.first() else {
                    return Ok((
                        DialogState::MainMenu,
                        vec![reply::catalog_empty(), self.menu_reply(&customer.chat_id).await?],
                    ));
                };

                let draft_id = self.builder.start(&customer.chat_id).await?;
                session.draft_cake_id = Some(draft_id);
                session.category_index = 0;
                Ok((DialogState::BuildingCake, vec![reply::category_prompt(first)]))
            }
            InputEvent::ViewOrders => {
                let orders = self.ledger.list_orders(&customer.chat_id).await?;
                if orders.is_empty() {
                    return Ok((
                        DialogState::MainMenu,
                        vec![reply::no_orders_yet(), reply::main_menu(false)],
                    ));
                }
                Ok((DialogState::OrderDetails, vec![reply::orders_list(&orders)]))
            }
            _ => Ok((DialogState::MainMenu, vec![reply::not_understood()])),
        }
    }

    async fn on_building(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
    ) -> Result<Outcome> {
        let draft_id = session
            .draft_cake_id
            .ok_or_else(|| DatabaseError::not_found("draft cake", "session"))?;

        if let InputEvent::ReturnToMenu = event {
            return self.abandon_flow(session, customer, draft_id).await;
        }

        let categories = self.catalog.load_ordered_categories().await?;
        let current = categories
            .get(session.category_index)
            .ok_or_else(|| DatabaseError::not_found("category", session.category_index))?;

        match event {
            InputEvent::SkipOption => {
                match self.builder.skip(draft_id, &current.category).await {
                    Ok(()) => {}
                    Err(Error::Builder(BuilderError::MandatoryCategory { category })) => {
                        return Ok((
                            DialogState::BuildingCake,
                            vec![
                                reply::mandatory_choice_required(&category),
                                reply::category_prompt(current),
                            ],
                        ));
                    }
                    Err(e) => return Err(e),
                }
                self.advance_category(session, &categories, draft_id).await
            }
            InputEvent::PickOption(option_id) => {
                let option = self.catalog.get_option(*option_id).await?;
                if option.category_id != current.category.id {
                    // A stale button from another category's keyboard.
                    return Ok((
                        DialogState::BuildingCake,
                        vec![reply::not_understood(), reply::category_prompt(current)],
                    ));
                }

                match self.builder.choose(draft_id, *option_id).await {
                    Ok(()) => {}
                    Err(Error::Builder(err)) => {
                        // Already-filled or committed: reject without advancing.
                        warn!(draft_id, error = %err, "Rejected option choice");
                        return Ok((
                            DialogState::BuildingCake,
                            vec![reply::not_understood(), reply::category_prompt(current)],
                        ));
                    }
                    Err(e) => return Err(e),
                }
                self.advance_category(session, &categories, draft_id).await
            }
            _ => Ok((DialogState::BuildingCake, vec![reply::not_understood()])),
        }
    }

    /// Move the traversal cursor forward; once past the last category the
    /// cake is finished (with an inscription detour when one was picked).
    async fn advance_category(
        &self,
        session: &mut SessionState,
        categories: &[CategoryWithOptions],
        draft_id: i64,
    ) -> Result<Outcome> {
        session.category_index += 1;

        if let Some(next) = categories.get(session.category_index) {
            return Ok((DialogState::BuildingCake, vec![reply::category_prompt(next)]));
        }

        let chosen = self.builder.options(draft_id).await?;
        if wants_inscription(&chosen, categories) {
            return Ok((DialogState::InputInscription, vec![reply::inscription_request()]));
        }

        let price = self.builder.price(draft_id).await?;
        Ok((DialogState::CakeReady, vec![reply::cake_ready(price)]))
    }

    async fn on_inscription(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
        raw: &str,
    ) -> Result<Outcome> {
        let draft_id = session
            .draft_cake_id
            .ok_or_else(|| DatabaseError::not_found("draft cake", "session"))?;

        if let InputEvent::ReturnToMenu = event {
            return self.abandon_flow(session, customer, draft_id).await;
        }

        // Inscriptions are free text; everything that isn't the exit button
        // is the inscription itself.
        self.builder.set_inscription(draft_id, raw).await?;
        let price = self.builder.price(draft_id).await?;
        Ok((DialogState::CakeReady, vec![reply::cake_ready(price)]))
    }

    async fn on_cake_ready(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
    ) -> Result<Outcome> {
        let draft_id = session
            .draft_cake_id
            .ok_or_else(|| DatabaseError::not_found("draft cake", "session"))?;

        match event {
            InputEvent::PlaceOrder => {
                let cake_id = match self.builder.commit(draft_id).await {
                    Ok(id) => id,
                    Err(Error::Builder(BuilderError::MandatoryUnanswered { category })) => {
                        return Ok((
                            DialogState::CakeReady,
                            vec![reply::mandatory_choice_required(&category)],
                        ));
                    }
                    Err(e) => return Err(e),
                };

                let order_id = self.ledger.create_order(&customer.chat_id, &[cake_id]).await?;
                session.draft_cake_id = None;
                session.current_order_id = Some(order_id);

                let mut replies = self.order_review_replies(order_id, customer).await?;
                replies.push(reply::order_review_prompt());
                Ok((DialogState::OrderReview, replies))
            }
            InputEvent::ReturnToMenu => self.abandon_flow(session, customer, draft_id).await,
            _ => Ok((DialogState::CakeReady, vec![reply::not_understood()])),
        }
    }

    async fn on_order_review(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
    ) -> Result<Outcome> {
        let order_id = session
            .current_order_id
            .ok_or_else(|| DatabaseError::not_found("order", "session"))?;

        match event {
            InputEvent::ConfirmOrder => {
                match self.ledger.advance_status(order_id).await {
                    Ok(_) => {}
                    Err(Error::Order(OrderError::InvalidTransition { .. })) => {
                        return Ok((
                            DialogState::OrderReview,
                            vec![OutgoingReply::text(
                                "This order can no longer be confirmed.",
                            )],
                        ));
                    }
                    Err(e) => return Err(e),
                }
                session.current_order_id = None;
                Ok((
                    DialogState::MainMenu,
                    vec![
                        reply::order_confirmed(order_id),
                        self.menu_reply(&customer.chat_id).await?,
                    ],
                ))
            }
            InputEvent::EditPhone => Ok((
                DialogState::ChangePhone,
                vec![reply::phone_request()],
            )),
            InputEvent::EditAddress => Ok((
                DialogState::ChangeAddress,
                vec![reply::address_request()],
            )),
            InputEvent::CancelOrder => {
                match self.ledger.cancel_order(order_id).await {
                    Ok(()) => {}
                    Err(Error::Order(OrderError::InvalidTransition { .. })) => {
                        return Ok((
                            DialogState::OrderReview,
                            vec![OutgoingReply::text(
                                "This order is already being processed and cannot be cancelled.",
                            )],
                        ));
                    }
                    Err(e) => return Err(e),
                }
                session.reset_flow();
                Ok((
                    DialogState::MainMenu,
                    vec![
                        reply::order_cancelled(),
                        self.menu_reply(&customer.chat_id).await?,
                    ],
                ))
            }
            _ => Ok((DialogState::OrderReview, vec![reply::not_understood()])),
        }
    }

    async fn on_change_phone(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        raw: &str,
    ) -> Result<Outcome> {
        let order_id = session
            .current_order_id
            .ok_or_else(|| DatabaseError::not_found("order", "session"))?;

        let phone = match validate_phone(raw) {
            Ok(phone) => phone,
            Err(_) => return Ok((DialogState::ChangePhone, vec![reply::phone_invalid()])),
        };
        self.profiles.set_phone(&customer.chat_id, &phone).await?;

        let refreshed = self.profiles.get(&customer.chat_id).await?;
        let mut replies = vec![reply::phone_saved(&phone)];
        replies.extend(self.order_review_replies(order_id, &refreshed).await?);
        replies.push(reply::order_review_prompt());
        Ok((DialogState::OrderReview, replies))
    }

    async fn on_change_address(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        raw: &str,
    ) -> Result<Outcome> {
        let order_id = session
            .current_order_id
            .ok_or_else(|| DatabaseError::not_found("order", "session"))?;

        self.profiles.set_address(&customer.chat_id, raw).await?;

        let refreshed = self.profiles.get(&customer.chat_id).await?;
        let mut replies = vec![reply::address_saved(raw)];
        replies.extend(self.order_review_replies(order_id, &refreshed).await?);
        replies.push(reply::order_review_prompt());
        Ok((DialogState::OrderReview, replies))
    }

    async fn on_order_details(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        event: &InputEvent,
    ) -> Result<Outcome> {
        match event {
            InputEvent::ReturnToMenu => {
                session.reset_flow();
                Ok((
                    DialogState::MainMenu,
                    vec![self.menu_reply(&customer.chat_id).await?],
                ))
            }
            InputEvent::PickOrder(order_id) => {
                let order = self.ledger.get_order(*order_id).await?;
                if order.customer_id != customer.chat_id {
                    // Not this customer's order; same answer as a stale id.
                    return Err(DatabaseError::not_found("order", *order_id).into());
                }
                let count = self.ledger.cake_count(*order_id).await?;
                Ok((
                    DialogState::OrderDetails,
                    vec![reply::order_summary(&order, customer, count)],
                ))
            }
            _ => Ok((DialogState::OrderDetails, vec![reply::not_understood()])),
        }
    }

    // ── Shared steps ────────────────────────────────────────────────

    /// Discard the draft and land the customer back where the gate sends
    /// them (the main menu, for an authorized customer).
    async fn abandon_flow(
        &self,
        session: &mut SessionState,
        customer: &Customer,
        draft_id: i64,
    ) -> Result<Outcome> {
        self.builder.discard(draft_id).await?;
        session.reset_flow();
        self.resolve_authorization(customer).await
    }

    /// The order summary block shown when (re-)entering review.
    async fn order_review_replies(
        &self,
        order_id: i64,
        customer: &Customer,
    ) -> Result<Vec<OutgoingReply>> {
        let order = self.ledger.get_order(order_id).await?;
        let count = self.ledger.cake_count(order_id).await?;
        Ok(vec![reply::order_summary(&order, customer, count)])
    }
}

/// Whether the finished cake includes an option from the inscription
/// category.
fn wants_inscription(chosen: &[CatalogOption], categories: &[CategoryWithOptions]) -> bool {
    chosen.iter().any(|option| {
        categories.iter().any(|c| {
            c.category.id == option.category_id
                && c.category.title.eq_ignore_ascii_case(INSCRIPTION_CATEGORY)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::store::LibSqlBackend;

    async fn engine() -> DialogueEngine {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        DialogueEngine::new(db, PathBuf::from("./files/personal_data_policy.pdf"))
    }

    #[tokio::test]
    async fn start_asks_for_consent_first() {
        let engine = engine().await;
        let (state, replies) = engine.handle_start("42", "Anna", None).await;
        assert_eq!(state, DialogState::ConsentProcessing);
        assert_eq!(replies[0].text, "Hi, Anna!");
        // The consent prompt carries the policy document.
        assert!(replies[1].document.is_some());
    }

    #[tokio::test]
    async fn event_before_start_is_harmless() {
        let engine = engine().await;
        let (state, replies) = engine.handle_event("42", "hello").await;
        assert_eq!(state, DialogState::Authorization);
        assert_eq!(replies[0].text, "Send /start to begin.");
    }

    #[tokio::test]
    async fn declining_consent_loops_back() {
        let engine = engine().await;
        engine.handle_start("42", "Anna", None).await;

        let (state, replies) = engine
            .handle_event("42", crate::dialogue::event::labels::DECLINE_CONSENT)
            .await;
        assert_eq!(state, DialogState::ConsentProcessing);
        // Acknowledgement, then the consent prompt again.
        assert!(replies[0].text.contains("cannot take orders"));
        assert!(replies[1].document.is_some());
    }

    #[tokio::test]
    async fn wants_inscription_matches_title_case_insensitively() {
        let categories = vec![CategoryWithOptions {
            category: Category {
                id: 5,
                title: "Inscription".into(),
                is_mandatory: false,
                choice_order: 5,
            },
            options: vec![],
        }];
        let chosen = vec![CatalogOption {
            id: 13,
            category_id: 5,
            name: "Custom inscription".into(),
            price: 500,
        }];
        assert!(wants_inscription(&chosen, &categories));

        let other = vec![CatalogOption {
            id: 1,
            category_id: 1,
            name: "One layer".into(),
            price: 400,
        }];
        assert!(!wants_inscription(&other, &categories));
    }
}
