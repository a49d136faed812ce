use crate::light::LightState;
use crate::negotiation::NegotiationOutcome;
use crate::Position;
use serde_json::json;

thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

pub fn debug_negotiation(from: Position, to: Position, outcome: &NegotiationOutcome) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "negotiation",
            "from": [from.x, from.y],
            "to": [to.x, to.y],
            "outcome": outcome,
            "granted": outcome.granted(),
        }))
    })
}

pub fn debug_light(pos: Position, from: LightState, to: LightState) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "light",
            "pos": [pos.x, pos.y],
            "from": from,
            "to": to,
        }))
    })
}

pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
