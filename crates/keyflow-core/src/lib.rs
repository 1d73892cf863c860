// Keyflow Core Library
// Event translation engine for input-device remapping

pub mod action;
pub mod config;
pub mod engine;
pub mod event;
pub mod expr;
pub mod input;
pub mod interp;
pub mod key;
pub mod modifier;
pub mod normalize;
pub mod output;
pub mod rules;
pub mod synth;

pub use action::KeyAction;
pub use config::{Settings, SettingsError};
pub use engine::TranslationEngine;
pub use event::{KeyEvent, RawEvent};
pub use expr::{Environment, Expr, ExprError, FunctionRegistry, Value};
pub use input::{
    list_devices, matches_device_filter, DeviceError, DeviceInfo, DeviceReader, PolledEvent,
    VIRTUAL_DEVICE_PREFIX,
};
pub use interp::{CallError, CallHandler, CallRegistry};
pub use key::{key_from_name, key_name, Key};
pub use modifier::{ModifierTracker, Modifiers};
pub use normalize::{MotionBatch, Normalized, Normalizer};
pub use output::{UInputError, VirtualOutput};
pub use rules::{ActionToken, RuleError, RuleTable};
pub use synth::expand_keystring;
