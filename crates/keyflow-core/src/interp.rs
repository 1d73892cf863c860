// Keyflow Action Interpreter
// Executes a matched rule's action list against session state

use std::collections::HashMap;
use std::fmt;

use log::{debug, error, info, warn};

use crate::event::{KeyEvent, RawEvent};
use crate::expr::{Environment, FunctionRegistry};
use crate::rules::ActionToken;
use crate::synth::expand_keystring;

/// Error surfaced by an external call handler
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CallError(pub String);

/// An external handler invocable by the `call` action.
///
/// Receives the pending queue plus the current event, the variable
/// environment, and the optional arg string; its result becomes the
/// dispatch output directly.
pub type CallHandler =
    Box<dyn FnMut(&[KeyEvent], &mut Environment, Option<&str>) -> Result<Vec<RawEvent>, CallError> + Send>;

/// Handlers registered at startup under `module:function` names.
#[derive(Default)]
pub struct CallRegistry {
    handlers: HashMap<String, CallHandler>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `module:function`
    pub fn register<F>(&mut self, module: &str, function: &str, handler: F)
    where
        F: FnMut(&[KeyEvent], &mut Environment, Option<&str>) -> Result<Vec<RawEvent>, CallError>
            + Send
            + 'static,
    {
        self.handlers
            .insert(format!("{}:{}", module, function), Box::new(handler));
    }

    fn invoke(
        &mut self,
        module: &str,
        function: &str,
        events: &[KeyEvent],
        env: &mut Environment,
        arg: Option<&str>,
    ) -> Result<Vec<RawEvent>, CallError> {
        let name = format!("{}:{}", module, function);
        match self.handlers.get_mut(&name) {
            Some(handler) => handler(events, env, arg),
            None => Err(CallError(format!("no handler registered for {}", name))),
        }
    }
}

impl fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("CallRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Execute an action list for one dispatched event.
///
/// A single boolean gate, initially open, is processed left to right:
/// `if` sets it, `else` inverts it, and every other action only runs
/// while it is open (`if`/`else` themselves always execute, so the
/// gate can be re-armed within one list). `call` short-circuits the
/// list and returns the handler's result; an evaluation failure in
/// `if`/`set`/`exec` aborts the remaining actions and yields empty
/// output, without rolling back state already mutated by earlier
/// actions in the same list.
pub fn execute(
    actions: &[ActionToken],
    event: &KeyEvent,
    queue: &mut Vec<KeyEvent>,
    env: &mut Environment,
    funcs: &FunctionRegistry,
    calls: &mut CallRegistry,
) -> Vec<RawEvent> {
    let mut output = Vec::new();
    let mut gate = true;

    for action in actions {
        debug!("Processing action: {:?}", action);
        match action {
            ActionToken::If(expr) => match expr.eval(env, funcs) {
                Ok(value) => {
                    gate = value.truthy();
                    debug!("if expression evaluated to {}", gate);
                }
                Err(e) => {
                    error!("Error evaluating if condition: {}", e);
                    return Vec::new();
                }
            },
            ActionToken::Else => gate = !gate,
            _ if !gate => {
                debug!("skipping action because of if or else: {:?}", action);
            }
            ActionToken::Send(keystring) => output.extend(expand_keystring(keystring)),
            ActionToken::Forward => {
                for buffered in queue.iter() {
                    output.extend(buffered.to_raw_events());
                }
                output.extend(event.to_raw_events());
            }
            ActionToken::Wait => queue.push(*event),
            ActionToken::Clear => queue.clear(),
            ActionToken::NoOp => {}
            ActionToken::Echo(text) => info!("{}", text),
            ActionToken::Set(name, expr) => match expr.eval(env, funcs) {
                Ok(value) => env.set(name.clone(), value),
                Err(e) => {
                    error!("Error evaluating set {}: {}", name, e);
                    return Vec::new();
                }
            },
            ActionToken::Exec(expr) => {
                if let Err(e) = expr.eval(env, funcs) {
                    error!("Error evaluating exec: {}", e);
                    return Vec::new();
                }
            }
            ActionToken::Call {
                module,
                function,
                arg,
            } => {
                let mut events: Vec<KeyEvent> = queue.clone();
                events.push(*event);
                return match calls.invoke(module, function, &events, env, arg.as_deref()) {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Error in call {}:{}: {}", module, function, e);
                        Vec::new()
                    }
                };
            }
            ActionToken::Unknown(raw) => warn!("Unknown action: {}", raw),
        }
    }

    output
}
