//! Message parser - Parses console lines into commands or guild messages

use serde_json::{Map, Value};

use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandInvocation};

/// A slash command as typed, before its options are typed against a schema
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl ParsedCommand {
    /// Build an invocation, typing each `key=value` pair with the command schema.
    ///
    /// Without a schema every value is passed through as a string.
    pub fn into_invocation(
        self,
        schema: Option<&Command>,
        guild_id: Option<u64>,
        channel_id: u64,
        user_id: u64,
    ) -> Result<CommandInvocation, CommandError> {
        let mut options = Map::new();

        for (key, raw) in self.args {
            let value = match schema {
                Some(schema) => {
                    let option = schema
                        .option(&key)
                        .ok_or_else(|| CommandError::InvalidArgs(format!("unknown option '{}'", key)))?;
                    option.kind.parse_value(&raw).ok_or_else(|| {
                        CommandError::InvalidArgs(format!("'{}' is not a valid {}", raw, option.kind.as_str()))
                    })?
                }
                None => Value::String(raw),
            };
            options.insert(key, value);
        }

        let mut invocation = CommandInvocation::new(self.name, guild_id, channel_id, user_id);
        invocation.options = options;
        Ok(invocation)
    }
}

/// What a console line turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(ParsedCommand),
    Message(String),
    Empty,
}

/// Parses console input lines
pub struct MessageParser {
    command_prefix: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn parse(&self, line: &str) -> Result<Inbound, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Inbound::Empty);
        }

        match line.strip_prefix(&self.command_prefix) {
            Some(rest) => self.parse_command(rest).map(Inbound::Command),
            None => Ok(Inbound::Message(line.to_string())),
        }
    }

    fn parse_command(&self, text: &str) -> Result<ParsedCommand, CommandError> {
        let mut tokens = tokenize(text)?.into_iter();
        let name = tokens
            .next()
            .filter(|name| !name.contains('='))
            .ok_or_else(|| CommandError::InvalidArgs("missing command name".to_string()))?;

        let args = tokens
            .map(|token| match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(CommandError::InvalidArgs(format!("expected key=value, got '{}'", token))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedCommand { name, args })
    }
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Split on whitespace; double quotes group a value with spaces in it
fn tokenize(text: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if quoted {
        return Err(CommandError::InvalidArgs("unterminated quote".to_string()));
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CommandOption, OptionKind};
    use serde_json::json;

    fn roll_schema() -> Command {
        let option = |name: &str, kind| CommandOption {
            name: name.to_string(),
            description: String::new(),
            kind,
            required: false,
            default: None,
        };
        Command::new("roll")
            .with_option(option("dice", OptionKind::Integer))
            .with_option(option("target", OptionKind::User))
            .with_option(option("note", OptionKind::String))
    }

    #[test]
    fn test_plain_text_is_a_message() {
        let parser = MessageParser::default();
        assert_eq!(
            parser.parse("Wordle 312 4/6").unwrap(),
            Inbound::Message("Wordle 312 4/6".to_string())
        );
        assert_eq!(parser.parse("   ").unwrap(), Inbound::Empty);
    }

    #[test]
    fn test_command_with_quoted_value() {
        let parser = MessageParser::default();
        let parsed = parser.parse(r#"/roll dice=2 note="for the meatball""#).unwrap();

        assert_eq!(
            parsed,
            Inbound::Command(ParsedCommand {
                name: "roll".to_string(),
                args: vec![
                    ("dice".to_string(), "2".to_string()),
                    ("note".to_string(), "for the meatball".to_string()),
                ],
            })
        );
    }

    #[test]
    fn test_malformed_commands() {
        let parser = MessageParser::default();
        assert!(parser.parse("/").is_err());
        assert!(parser.parse("/roll dice").is_err());
        assert!(parser.parse(r#"/roll note="open"#).is_err());
    }

    #[test]
    fn test_options_typed_by_schema() {
        let schema = roll_schema();
        let parsed = ParsedCommand {
            name: "roll".to_string(),
            args: vec![
                ("dice".to_string(), "3".to_string()),
                ("target".to_string(), "<@!42>".to_string()),
            ],
        };

        let invocation = parsed.into_invocation(Some(&schema), Some(1), 2, 3).unwrap();
        assert_eq!(invocation.options["dice"], json!(3));
        assert_eq!(invocation.options["target"], json!(42));
        assert_eq!((invocation.guild_id, invocation.channel_id, invocation.user_id), (Some(1), 2, 3));
    }

    #[test]
    fn test_bad_option_values_rejected() {
        let schema = roll_schema();
        let bad_value = ParsedCommand {
            name: "roll".to_string(),
            args: vec![("dice".to_string(), "many".to_string())],
        };
        let unknown = ParsedCommand {
            name: "roll".to_string(),
            args: vec![("colour".to_string(), "red".to_string())],
        };

        assert!(matches!(
            bad_value.into_invocation(Some(&schema), None, 2, 3),
            Err(CommandError::InvalidArgs(_))
        ));
        assert!(matches!(
            unknown.into_invocation(Some(&schema), None, 2, 3),
            Err(CommandError::InvalidArgs(_))
        ));
    }
}
