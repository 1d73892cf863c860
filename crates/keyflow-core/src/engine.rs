// Keyflow Translation Engine
// One session per physical input device: owns the pending queue, the
// variable environment and the normalizer, and drives rule dispatch

use std::sync::Arc;

use log::{debug, warn};

use crate::event::{KeyEvent, RawEvent};
use crate::expr::{Environment, FunctionRegistry, Value};
use crate::interp::{self, CallRegistry};
use crate::normalize::{Normalized, Normalizer};
use crate::rules::RuleTable;

/// The event translation engine.
///
/// Single-threaded and purely reactive: one raw event in, a bounded
/// output sequence out. All state is owned exclusively by this
/// instance; a process serving several physical devices creates one
/// engine per device. The rule table is shared read-only.
#[derive(Debug)]
pub struct TranslationEngine {
    rules: Arc<RuleTable>,
    normalizer: Normalizer,
    queue: Vec<KeyEvent>,
    env: Environment,
    funcs: FunctionRegistry,
    calls: CallRegistry,
}

impl TranslationEngine {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            rules,
            normalizer: Normalizer::new(),
            queue: Vec::new(),
            env: Environment::new(),
            funcs: FunctionRegistry::with_defaults(),
            calls: CallRegistry::new(),
        }
    }

    /// The expression function registry, for registering additional
    /// functions at startup.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.funcs
    }

    /// The call-handler registry, for registering `call` targets at
    /// startup.
    pub fn calls_mut(&mut self) -> &mut CallRegistry {
        &mut self.calls
    }

    /// The variable environment for this session
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The in-progress multi-key sequence
    pub fn queue(&self) -> &[KeyEvent] {
        &self.queue
    }

    /// Feed one raw device event and collect the output to replay on
    /// the virtual device. Pointer motion passes through in complete
    /// sync groups; key events go through rule dispatch.
    pub fn handle_raw(&mut self, raw: RawEvent) -> Vec<RawEvent> {
        match self.normalizer.feed(raw) {
            Normalized::Nothing => Vec::new(),
            Normalized::Motion(events) => events,
            Normalized::Key(event) => self.dispatch(event),
        }
    }

    /// Dispatch a logical key event against the rule table.
    ///
    /// The candidate signature is the space-joined pending-queue
    /// signatures followed by the event's own signature. A miss is
    /// logged and leaves the queue untouched; an in-progress sequence
    /// is only abandoned by an explicit `clear`.
    pub fn dispatch(&mut self, event: KeyEvent) -> Vec<RawEvent> {
        debug!("Received {}", event);

        let queue_signature = self
            .queue
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let signature = if queue_signature.is_empty() {
            event.to_string()
        } else {
            format!("{} {}", queue_signature, event)
        };

        let Some(actions) = self.rules.get(&signature) else {
            warn!("Unknown key sequence: {}", signature);
            return Vec::new();
        };

        self.env.set("queue", Value::Str(queue_signature));
        self.env.set("keyevent", Value::Str(event.to_string()));

        let output = interp::execute(
            actions,
            &event,
            &mut self.queue,
            &mut self.env,
            &self.funcs,
            &mut self.calls,
        );
        debug!("dispatch returning {} events", output.len());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EV_KEY, EV_REL};
    use crate::modifier::Modifiers;
    use crate::synth::expand_keystring;
    use crate::Key;

    fn engine(rules: &str) -> TranslationEngine {
        TranslationEngine::new(Arc::new(RuleTable::parse(rules).unwrap()))
    }

    #[test]
    fn test_miss_leaves_queue_unchanged() {
        let mut engine = engine("Ctrl-KEY_P-down = wait\n");
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 29, 1)); // ctrl down
        assert!(out.is_empty());
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 25, 1)); // Ctrl-KEY_P-down -> wait
        assert!(out.is_empty());
        assert_eq!(engine.queue().len(), 1);

        // No rule continues the sequence with KEY_A; the queue must
        // survive the miss.
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 30, 1));
        assert!(out.is_empty());
        assert_eq!(engine.queue().len(), 1);
    }

    #[test]
    fn test_two_key_sequence_forward_clear() {
        let mut engine = engine(
            "Ctrl-KEY_P-down = wait\n\
             Ctrl-KEY_P-down KEY_P-up = forward; clear\n",
        );
        engine.handle_raw(RawEvent::new(EV_KEY, 29, 1)); // ctrl down
        engine.handle_raw(RawEvent::new(EV_KEY, 25, 1)); // wait
        engine.handle_raw(RawEvent::new(EV_KEY, 29, 0)); // ctrl up
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 25, 0)); // completes sequence

        let buffered = KeyEvent::down(Key(25), Modifiers::CTRL);
        let current = KeyEvent::up(Key(25), Modifiers::NONE);
        let mut expected: Vec<RawEvent> = buffered.to_raw_events().into_vec();
        expected.extend(current.to_raw_events());
        assert_eq!(out, expected);
        assert!(engine.queue().is_empty());
    }

    #[test]
    fn test_send_rule() {
        let mut engine = engine("KEY_A-down = send Shift-KEY_B\nKEY_A-up = none\n");
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 30, 1));
        assert_eq!(out, expand_keystring("Shift-KEY_B"));
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 30, 0));
        assert!(out.is_empty());
    }

    #[test]
    fn test_motion_passthrough_bypasses_rules() {
        let mut engine = engine("KEY_A-down = send KEY_B\n");
        assert!(engine.handle_raw(RawEvent::new(EV_REL, 0, 7)).is_empty());
        let out = engine.handle_raw(RawEvent::SYNC);
        assert_eq!(
            out,
            vec![RawEvent::new(EV_REL, 0, 7), RawEvent::SYNC]
        );
    }

    #[test]
    fn test_reserved_bindings_refreshed() {
        let mut engine = engine(
            "KEY_A-down = if keyevent == 'KEY_A-down'; send KEY_B\n",
        );
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 30, 1));
        assert_eq!(out, expand_keystring("KEY_B"));
        assert_eq!(
            engine.environment().get("keyevent"),
            Some(&Value::Str("KEY_A-down".into()))
        );
    }

    #[test]
    fn test_queue_binding_reflects_pending_sequence() {
        let mut engine = engine(
            "KEY_A-down = wait\n\
             KEY_A-down KEY_B-down = if queue == 'KEY_A-down'; forward; clear\n",
        );
        engine.handle_raw(RawEvent::new(EV_KEY, 30, 1));
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 48, 1));
        assert!(!out.is_empty());
        assert!(engine.queue().is_empty());
    }

    #[test]
    fn test_variables_persist_across_dispatches() {
        let mut engine = engine(
            "KEY_A-down = set n 1\n\
             KEY_A-up = if n == 1; send KEY_B\n",
        );
        engine.handle_raw(RawEvent::new(EV_KEY, 30, 1));
        let out = engine.handle_raw(RawEvent::new(EV_KEY, 30, 0));
        assert_eq!(out, expand_keystring("KEY_B"));
    }
}
