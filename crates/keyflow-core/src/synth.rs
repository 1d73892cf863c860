// Keyflow Event Synthesizer
// Expands a textual key description into the exact raw event sequence

use log::warn;
use smallvec::SmallVec;

use crate::event::RawEvent;
use crate::key::key_from_name;
use crate::modifier::{KEY_LEFTALT, KEY_LEFTCTRL, KEY_LEFTSHIFT};
use crate::KeyAction;

/// Expand a space-separated keystring into raw events.
///
/// Each token may carry any number of `Ctrl-`/`Alt-`/`Shift-` prefixes
/// followed by a symbolic key name, optionally suffixed with `-down` or
/// `-up` (no suffix taps the key: down then up). Modifier prefixes are
/// pressed in encounter order and released in reverse, bracketing the
/// key. Every token that produced events is terminated by one sync
/// marker.
///
/// Unknown key names are logged and contribute no key events; modifier
/// brackets already opened for the token are still unwound.
pub fn expand_keystring(keystring: &str) -> Vec<RawEvent> {
    let mut res = Vec::new();
    for token in keystring.split(' ').filter(|t| !t.is_empty()) {
        expand_token(token, &mut res);
    }
    res
}

fn expand_token(token: &str, res: &mut Vec<RawEvent>) {
    let start = res.len();
    let mut untap: SmallVec<[RawEvent; 4]> = SmallVec::new();
    let mut rest = token;

    loop {
        let (modifier, stripped) = if let Some(s) = rest.strip_prefix("Ctrl-") {
            (KEY_LEFTCTRL, s)
        } else if let Some(s) = rest.strip_prefix("Alt-") {
            (KEY_LEFTALT, s)
        } else if let Some(s) = rest.strip_prefix("Shift-") {
            (KEY_LEFTSHIFT, s)
        } else {
            break;
        };
        res.push(RawEvent::key(modifier, KeyAction::Press));
        untap.push(RawEvent::key(modifier, KeyAction::Release));
        rest = stripped;
    }

    let (name, suffix) = match rest.split_once('-') {
        Some((name, suffix)) => (name, Some(suffix)),
        None => (rest, None),
    };

    match key_from_name(name) {
        Some(key) => {
            if matches!(suffix, None | Some("down")) {
                res.push(RawEvent::key(key, KeyAction::Press));
            }
            if matches!(suffix, None | Some("up")) {
                res.push(RawEvent::key(key, KeyAction::Release));
            }
        }
        None => warn!("Unknown key {}", name),
    }

    res.extend(untap.into_iter().rev());

    if res.len() > start {
        res.push(RawEvent::SYNC);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    fn down(key: Key) -> RawEvent {
        RawEvent::key(key, KeyAction::Press)
    }

    fn up(key: Key) -> RawEvent {
        RawEvent::key(key, KeyAction::Release)
    }

    #[test]
    fn test_bare_key_taps() {
        let events = expand_keystring("KEY_P");
        assert_eq!(
            events,
            vec![down(Key(25)), up(Key(25)), RawEvent::SYNC]
        );
    }

    #[test]
    fn test_down_and_up_suffixes() {
        assert_eq!(
            expand_keystring("KEY_P-down"),
            vec![down(Key(25)), RawEvent::SYNC]
        );
        assert_eq!(
            expand_keystring("KEY_P-up"),
            vec![up(Key(25)), RawEvent::SYNC]
        );
    }

    #[test]
    fn test_single_modifier_brackets() {
        let events = expand_keystring("Shift-KEY_P");
        assert_eq!(
            events,
            vec![
                down(KEY_LEFTSHIFT),
                down(Key(25)),
                up(Key(25)),
                up(KEY_LEFTSHIFT),
                RawEvent::SYNC,
            ]
        );
    }

    #[test]
    fn test_nested_modifiers_unwind_lifo() {
        let events = expand_keystring("Ctrl-Alt-KEY_P-down");
        assert_eq!(
            events,
            vec![
                down(KEY_LEFTCTRL),
                down(KEY_LEFTALT),
                down(Key(25)),
                up(KEY_LEFTALT),
                up(KEY_LEFTCTRL),
                RawEvent::SYNC,
            ]
        );
    }

    #[test]
    fn test_multiple_tokens_each_synced() {
        let events = expand_keystring("KEY_LEFTCTRL-down KEY_P KEY_LEFTCTRL-up");
        assert_eq!(
            events,
            vec![
                down(Key(29)),
                RawEvent::SYNC,
                down(Key(25)),
                up(Key(25)),
                RawEvent::SYNC,
                up(Key(29)),
                RawEvent::SYNC,
            ]
        );
    }

    #[test]
    fn test_unknown_key_skipped() {
        assert!(expand_keystring("KEY_BOGUS").is_empty());
    }

    #[test]
    fn test_unknown_key_still_unwinds_brackets() {
        // The modifier bracket around an unknown key is still opened
        // and closed, and the token gets its sync marker.
        let events = expand_keystring("Shift-KEY_BOGUS");
        assert_eq!(
            events,
            vec![
                down(KEY_LEFTSHIFT),
                up(KEY_LEFTSHIFT),
                RawEvent::SYNC,
            ]
        );
    }

    #[test]
    fn test_empty_keystring() {
        assert!(expand_keystring("").is_empty());
        assert!(expand_keystring("  ").is_empty());
    }
}
