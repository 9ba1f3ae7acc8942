//! Card-on-file binding requests.
//!
//! A `BindRequest` mirrors the order flow for storing a member's card with the vendor, with one
//! deliberate difference: its signed form may be materialized exactly once. Serving the same
//! binding form twice would let a stale page replay the binding, so the second materialization
//! is an error rather than a re-render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::OrderError,
    order::{render_form, FailedMessage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindState {
    Inited,
    /// The binding form has been served; awaiting the vendor callback.
    FormMaterialized,
    Bound,
    Failed,
}

/// The stored-card details returned by a successful binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundCard {
    pub card_id: String,
    pub card_first6: String,
    pub card_last4: String,
    pub binding_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindRequest {
    member_id: String,
    merchant_id: String,
    form_fields: Vec<(String, String)>,
    action_url: String,
    state: BindState,
    card: Option<BoundCard>,
    failed_message: Option<FailedMessage>,
    created_at: DateTime<Utc>,
}

impl BindRequest {
    pub(crate) fn new(
        member_id: String,
        merchant_id: String,
        form_fields: Vec<(String, String)>,
        action_url: String,
    ) -> Self {
        Self {
            member_id,
            merchant_id,
            form_fields,
            action_url,
            state: BindState::Inited,
            card: None,
            failed_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    pub fn form_fields(&self) -> &[(String, String)] {
        &self.form_fields
    }

    pub fn card(&self) -> Option<&BoundCard> {
        self.card.as_ref()
    }

    pub fn failed_message(&self) -> Option<&FailedMessage> {
        self.failed_message.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True while the request is waiting for the vendor's binding callback.
    pub fn pending(&self) -> bool {
        self.state == BindState::FormMaterialized
    }

    /// Render the signed binding form. Single-use: a second call is an error.
    pub fn materialize(&mut self) -> Result<String, OrderError> {
        if self.state != BindState::Inited {
            return Err(OrderError::FormAlreadyMaterialized);
        }
        self.state = BindState::FormMaterialized;
        Ok(render_form("pgw-bind-card", &self.action_url, &self.form_fields))
    }

    pub fn bind(&mut self, card: BoundCard) -> Result<(), OrderError> {
        if !self.pending() {
            return Err(OrderError::BindingNotPending);
        }
        self.card = Some(card);
        self.state = BindState::Bound;
        Ok(())
    }

    pub fn fail(&mut self, code: i64, message: String) -> Result<(), OrderError> {
        if !self.pending() {
            return Err(OrderError::BindingNotPending);
        }
        self.failed_message = Some(FailedMessage { code, message });
        self.state = BindState::Failed;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request() -> BindRequest {
        BindRequest::new(
            "2000132M0001".into(),
            "2000132".into(),
            vec![("MerchantMemberID".into(), "2000132M0001".into())],
            "https://vendor.example.com/MerchantMember/BindingCardID".into(),
        )
    }

    #[test]
    fn materialize_is_single_use() {
        let mut req = request();
        let html = req.materialize().expect("first materialization");
        assert!(html.contains("2000132M0001"));
        assert_eq!(req.state(), BindState::FormMaterialized);
        let err = req.materialize().unwrap_err();
        assert!(matches!(err, OrderError::FormAlreadyMaterialized));
    }

    #[test]
    fn bind_requires_materialized_form() {
        let mut req = request();
        let card = BoundCard {
            card_id: "147253".into(),
            card_first6: "431195".into(),
            card_last4: "2222".into(),
            binding_date: "2026/08/29 10:00:00".into(),
        };
        assert!(req.bind(card.clone()).is_err());
        req.materialize().unwrap();
        req.bind(card).unwrap();
        assert_eq!(req.state(), BindState::Bound);
        assert_eq!(req.card().unwrap().card_last4, "2222");
        // terminal
        assert!(req.fail(1, "late".into()).is_err());
    }

    #[test]
    fn failed_binding_records_vendor_message() {
        let mut req = request();
        req.materialize().unwrap();
        req.fail(10_100_058, "binding rejected".into()).unwrap();
        assert_eq!(req.state(), BindState::Failed);
        assert_eq!(req.failed_message().unwrap().code, 10_100_058);
        assert!(!req.pending());
    }
}
