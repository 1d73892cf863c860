// Keyflow Rule Store
// Parses the keymap file into a signature -> action-list table

use std::path::Path;

use indexmap::IndexMap;

use crate::expr::{Expr, ExprError};

/// One parsed action token from a rule's action list.
///
/// Verbs other than `if`/`else` only run while the conditional gate is
/// open; see the interpreter for execution semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionToken {
    /// `if <expr>`: set the gate from the expression's truthiness
    If(Expr),
    /// `else`: invert the gate
    Else,
    /// `send <keystring>`: synthesize events from the keystring
    Send(String),
    /// `forward`: replay the pending queue plus the current event
    Forward,
    /// `wait`: push the current event onto the pending queue
    Wait,
    /// `clear`: empty the pending queue
    Clear,
    /// `none`: swallow the event
    NoOp,
    /// `echo <text>`: informational logging only
    Echo(String),
    /// `set <name> <expr>`: evaluate and bind a variable
    Set(String, Expr),
    /// `exec <expr>`: evaluate for side effects, discard the value
    Exec(Expr),
    /// `call <module>:<function>[:<arg>]`: delegate to a registered handler
    Call {
        module: String,
        function: String,
        arg: Option<String>,
    },
    /// Anything unrecognized; logged and skipped at dispatch time
    Unknown(String),
}

/// Errors from parsing a single action token
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Bad expression in '{action}': {source}")]
    BadExpression {
        action: String,
        source: ExprError,
    },

    #[error("Missing expression in '{0}'")]
    MissingExpression(String),

    #[error("Bad call target in '{0}' (expected module:function[:arg])")]
    BadCall(String),
}

impl ActionToken {
    /// Parse one semicolon-delimited action token (already trimmed)
    pub fn parse(action: &str) -> Result<ActionToken, ActionError> {
        let bad_expr = |source| ActionError::BadExpression {
            action: action.to_string(),
            source,
        };

        if let Some(rest) = action.strip_prefix("if ") {
            return Ok(ActionToken::If(Expr::parse(rest).map_err(bad_expr)?));
        }
        if action == "else" {
            return Ok(ActionToken::Else);
        }
        if let Some(rest) = action.strip_prefix("send ") {
            return Ok(ActionToken::Send(rest.to_string()));
        }
        if action == "forward" {
            return Ok(ActionToken::Forward);
        }
        if action == "wait" {
            return Ok(ActionToken::Wait);
        }
        if action == "clear" {
            return Ok(ActionToken::Clear);
        }
        if action == "none" {
            return Ok(ActionToken::NoOp);
        }
        if let Some(rest) = action.strip_prefix("echo ") {
            return Ok(ActionToken::Echo(rest.to_string()));
        }
        if let Some(rest) = action.strip_prefix("set ") {
            let (name, expr) = rest
                .split_once(' ')
                .ok_or_else(|| ActionError::MissingExpression(action.to_string()))?;
            let expr = Expr::parse(expr.trim()).map_err(bad_expr)?;
            return Ok(ActionToken::Set(name.to_string(), expr));
        }
        if let Some(rest) = action.strip_prefix("exec ") {
            return Ok(ActionToken::Exec(Expr::parse(rest).map_err(bad_expr)?));
        }
        if let Some(rest) = action.strip_prefix("call ") {
            let mut parts = rest.trim().splitn(3, ':');
            let module = parts.next().unwrap_or_default();
            let function = parts.next().unwrap_or_default();
            let arg = parts.next();
            if module.is_empty() || function.is_empty() {
                return Err(ActionError::BadCall(action.to_string()));
            }
            return Ok(ActionToken::Call {
                module: module.to_string(),
                function: function.to_string(),
                arg: arg.map(str::to_string),
            });
        }

        Ok(ActionToken::Unknown(action.to_string()))
    }
}

/// Errors from loading a keymap file
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: missing '=' separator")]
    MissingEquals { line: usize },

    #[error("Line {line}: empty signature")]
    EmptySignature { line: usize },

    #[error("Line {line}: duplicate signature '{signature}'")]
    DuplicateSignature { signature: String, line: usize },

    #[error("Line {line}: {source}")]
    BadAction {
        line: usize,
        source: ActionError,
    },
}

/// Mapping from a signature string to its ordered action list.
///
/// Built once at startup from the keymap file, read-only thereafter.
/// The signature of a multi-key sequence is the space-joined
/// concatenation of the buffered events' signatures plus the final
/// event's signature.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: IndexMap<String, Vec<ActionToken>>,
}

impl RuleTable {
    /// Parse keymap text: `signature = action; action; ...` per line,
    /// blank lines and `#` comments ignored.
    ///
    /// Parsing is strict: a malformed line or duplicate signature
    /// fails the whole load.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut rules = IndexMap::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (left, right) = trimmed
                .split_once('=')
                .ok_or(RuleError::MissingEquals { line })?;
            let signature = left.trim();
            if signature.is_empty() {
                return Err(RuleError::EmptySignature { line });
            }
            if rules.contains_key(signature) {
                return Err(RuleError::DuplicateSignature {
                    signature: signature.to_string(),
                    line,
                });
            }

            let mut actions = Vec::new();
            for action in right.split(';') {
                let action = action.trim();
                if action.is_empty() {
                    continue;
                }
                actions.push(
                    ActionToken::parse(action)
                        .map_err(|source| RuleError::BadAction { line, source })?,
                );
            }

            rules.insert(signature.to_string(), actions);
        }

        Ok(Self { rules })
    }

    /// Load a keymap from a file path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Look up the action list for a signature
    pub fn get(&self, signature: &str) -> Option<&[ActionToken]> {
        self.rules.get(signature).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate rules in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ActionToken])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_rules() {
        let table = RuleTable::parse(
            "# comment\n\
             \n\
             KEY_A-down = send KEY_B\n\
             Ctrl-KEY_P-down = wait\n\
             Ctrl-KEY_P-down KEY_P-up = forward; clear\n",
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get("KEY_A-down"),
            Some(&[ActionToken::Send("KEY_B".into())][..])
        );
        assert_eq!(
            table.get("Ctrl-KEY_P-down KEY_P-up"),
            Some(&[ActionToken::Forward, ActionToken::Clear][..])
        );
        assert!(table.get("KEY_B-down").is_none());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let table = RuleTable::parse("  KEY_A-down   =   send KEY_B ;  clear  \n").unwrap();
        assert_eq!(
            table.get("KEY_A-down"),
            Some(&[ActionToken::Send("KEY_B".into()), ActionToken::Clear][..])
        );
    }

    #[test]
    fn test_missing_equals_is_fatal() {
        let err = RuleTable::parse("KEY_A-down send KEY_B\n").unwrap_err();
        assert!(matches!(err, RuleError::MissingEquals { line: 1 }));
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let err = RuleTable::parse(
            "KEY_A-down = send KEY_B\n\
             KEY_A-down = send KEY_C\n",
        )
        .unwrap_err();
        match err {
            RuleError::DuplicateSignature { signature, line } => {
                assert_eq!(signature, "KEY_A-down");
                assert_eq!(line, 2);
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_expression_is_fatal() {
        let err = RuleTable::parse("KEY_A-down = if (1 +\n").unwrap_err();
        assert!(matches!(err, RuleError::BadAction { line: 1, .. }));
    }

    #[test]
    fn test_set_requires_expression() {
        let err = RuleTable::parse("KEY_A-down = set t\n").unwrap_err();
        assert!(matches!(
            err,
            RuleError::BadAction {
                source: ActionError::MissingExpression(_),
                ..
            }
        ));
    }

    #[test]
    fn test_call_parsing() {
        let table = RuleTable::parse(
            "KEY_A-down = call media:play\n\
             KEY_B-down = call media:seek:+30\n",
        )
        .unwrap();
        assert_eq!(
            table.get("KEY_A-down"),
            Some(
                &[ActionToken::Call {
                    module: "media".into(),
                    function: "play".into(),
                    arg: None,
                }][..]
            )
        );
        assert_eq!(
            table.get("KEY_B-down"),
            Some(
                &[ActionToken::Call {
                    module: "media".into(),
                    function: "seek".into(),
                    arg: Some("+30".into()),
                }][..]
            )
        );
    }

    #[test]
    fn test_bad_call_is_fatal() {
        let err = RuleTable::parse("KEY_A-down = call media\n").unwrap_err();
        assert!(matches!(
            err,
            RuleError::BadAction {
                source: ActionError::BadCall(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action_kept_for_dispatch() {
        // Unknown verbs are not load errors; they are logged and
        // skipped when the rule fires.
        let table = RuleTable::parse("KEY_A-down = frobnicate\n").unwrap();
        assert_eq!(
            table.get("KEY_A-down"),
            Some(&[ActionToken::Unknown("frobnicate".into())][..])
        );
    }

    #[test]
    fn test_if_else_tokens() {
        let table =
            RuleTable::parse("BTN_RIGHT-up = if (time() - t) > 0.3; send BTN_RIGHT; else; none\n")
                .unwrap();
        let actions = table.get("BTN_RIGHT-up").unwrap();
        assert_eq!(actions.len(), 4);
        assert!(matches!(actions[0], ActionToken::If(_)));
        assert!(matches!(actions[2], ActionToken::Else));
        assert!(matches!(actions[3], ActionToken::NoOp));
    }
}
