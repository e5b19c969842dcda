// ===============================
// src/inquiry.rs (customer inquiry state machine)
// ===============================
//
// RECEIVED -> QUOTED happens at the connector. `on_message` quotes and
// completes in one step (QUOTED -> DONE). REJECTED and CUSTOMER_REJECTED are
// only reached through `set_state`.
//
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{Inquiry, InquiryState};
use crate::error::DeskError;
use crate::metrics::INQUIRIES;
use crate::service::{KeyedService, Listener};

pub struct InquiryService {
    inquiries: KeyedService<String, Inquiry>,
    quote_px: Decimal,
}

fn refuse(inquiry_id: &str, from: InquiryState, to: InquiryState) -> DeskError {
    DeskError::InvalidTransition { id: inquiry_id.to_string(), from: from.to_string(), to: to.to_string() }
}

impl InquiryService {
    pub fn new(quote_px: Decimal) -> Self {
        Self { inquiries: KeyedService::new("inquiry"), quote_px }
    }

    /// Quote a QUOTED inquiry at the desk price, mark it DONE, store and publish.
    /// Any other state is refused and nothing is stored.
    pub fn on_message(&mut self, mut inquiry: Inquiry) -> Result<(), DeskError> {
        if inquiry.state != InquiryState::Quoted {
            warn!(inquiry_id = %inquiry.inquiry_id, state = %inquiry.state, "inquiry not quotable");
            return Err(refuse(&inquiry.inquiry_id, inquiry.state, InquiryState::Done));
        }
        inquiry.price = self.quote_px;
        inquiry.state = InquiryState::Done;

        INQUIRIES.with_label_values(&[&inquiry.state.to_string()]).inc();
        info!(
            inquiry_id = %inquiry.inquiry_id,
            product = %inquiry.product.product_id,
            side = %inquiry.side,
            qty = inquiry.quantity,
            px = %inquiry.price,
            "inquiry done"
        );
        self.inquiries.publish(inquiry)
    }

    /// Move a stored, non-terminal inquiry to `state` and run the update hooks.
    pub fn set_state(&mut self, inquiry_id: &str, state: InquiryState) -> Result<(), DeskError> {
        let mut inquiry = self.get(inquiry_id)?.clone();
        if inquiry.state.is_terminal() {
            return Err(refuse(inquiry_id, inquiry.state, state));
        }
        inquiry.state = state;
        INQUIRIES.with_label_values(&[&state.to_string()]).inc();
        info!(inquiry_id, state = %state, "inquiry state set");
        self.inquiries.publish_update(inquiry)
    }

    pub fn reject(&mut self, inquiry_id: &str) -> Result<(), DeskError> {
        self.set_state(inquiry_id, InquiryState::Rejected)
    }

    pub fn get(&self, inquiry_id: &str) -> Result<&Inquiry, DeskError> {
        self.inquiries.get(&inquiry_id.to_string())
    }

    pub fn add_listener(&mut self, listener: Listener<Inquiry>) {
        self.inquiries.add_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::fixtures::bond;
    use crate::service::ServiceListener;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn inquiry(id: &str, state: InquiryState) -> Inquiry {
        Inquiry {
            inquiry_id: id.into(),
            product: bond("P1"),
            side: Side::Buy,
            quantity: 1_000_000,
            price: dec!(99.5),
            state,
        }
    }

    #[derive(Default)]
    struct Seen(RefCell<Vec<(&'static str, InquiryState)>>);
    impl ServiceListener<Inquiry> for Seen {
        fn process_add(&self, data: &Inquiry) -> Result<(), DeskError> {
            self.0.borrow_mut().push(("add", data.state));
            Ok(())
        }
        fn process_update(&self, data: &Inquiry) -> Result<(), DeskError> {
            self.0.borrow_mut().push(("update", data.state));
            Ok(())
        }
    }

    #[test]
    fn quoted_inquiry_completes_at_the_desk_price() {
        let seen = Rc::new(Seen::default());
        let mut svc = InquiryService::new(dec!(100));
        svc.add_listener(seen.clone());

        svc.on_message(inquiry("INQ1", InquiryState::Quoted)).unwrap();

        let stored = svc.get("INQ1").unwrap();
        assert_eq!((stored.state, stored.price), (InquiryState::Done, dec!(100)));
        assert_eq!(*seen.0.borrow(), vec![("add", InquiryState::Done)]);
    }

    #[test]
    fn other_states_are_refused_and_not_stored() {
        let mut svc = InquiryService::new(dec!(100));
        for state in [InquiryState::Received, InquiryState::Done, InquiryState::Rejected] {
            let err = svc.on_message(inquiry("INQ2", state)).unwrap_err();
            assert!(matches!(err, DeskError::InvalidTransition { .. }));
        }
        assert!(svc.get("INQ2").is_err());
    }

    #[test]
    fn terminal_inquiries_cannot_be_reassigned() {
        let mut svc = InquiryService::new(dec!(100));
        svc.on_message(inquiry("INQ1", InquiryState::Quoted)).unwrap();

        let err = svc.reject("INQ1").unwrap_err();

        assert_eq!(
            err,
            DeskError::InvalidTransition { id: "INQ1".into(), from: "DONE".into(), to: "REJECTED".into() }
        );
        assert_eq!(svc.get("INQ1").unwrap().state, InquiryState::Done);
    }

    #[test]
    fn set_state_goes_through_the_update_hook() {
        let seen = Rc::new(Seen::default());
        let mut svc = InquiryService::new(dec!(100));
        svc.add_listener(seen.clone());
        svc.inquiries.put(inquiry("INQ7", InquiryState::Quoted));

        svc.set_state("INQ7", InquiryState::CustomerRejected).unwrap();

        assert_eq!(svc.get("INQ7").unwrap().state, InquiryState::CustomerRejected);
        assert_eq!(*seen.0.borrow(), vec![("update", InquiryState::CustomerRejected)]);
        assert_eq!(svc.set_state("INQ9", InquiryState::Rejected).unwrap_err(), DeskError::unknown("inquiry", "INQ9"));
    }
}
