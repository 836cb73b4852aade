use serde_json::{Map, Value};

/// Caller and environment data handed to a plugin for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationContext {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub user_id: u64,
    pub message_id: Option<u64>,
    pub options: Map<String, Value>,
}

impl InvocationContext {
    pub fn new(guild_id: Option<u64>, channel_id: u64, user_id: u64) -> Self {
        Self {
            guild_id,
            channel_id,
            user_id,
            message_id: None,
            options: Map::new(),
        }
    }

    pub fn with_message(mut self, message_id: u64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Protocol flags for this context, in wire order
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(guild_id) = self.guild_id {
            args.push("--guild".to_string());
            args.push(guild_id.to_string());
        }

        args.push("--channel".to_string());
        args.push(self.channel_id.to_string());
        args.push("--user".to_string());
        args.push(self.user_id.to_string());

        if let Some(message_id) = self.message_id {
            args.push("--message".to_string());
            args.push(message_id.to_string());
        }

        if !self.options.is_empty() {
            args.push("--".to_string());
            // A map of JSON values always serializes.
            args.push(Value::Object(self.options.clone()).to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_without_message_or_options() {
        let ctx = InvocationContext::new(Some(1), 2, 3);
        assert_eq!(ctx.to_args(), vec!["--guild", "1", "--channel", "2", "--user", "3"]);
    }

    #[test]
    fn test_context_with_message_and_options() {
        let ctx = InvocationContext::new(Some(1), 2, 3)
            .with_message(9)
            .with_option("message", "hi");

        assert_eq!(
            ctx.to_args(),
            vec![
                "--guild", "1", "--channel", "2", "--user", "3", "--message", "9", "--",
                r#"{"message":"hi"}"#,
            ]
        );
    }

    #[test]
    fn test_guild_flag_omitted_without_guild() {
        let args = InvocationContext::new(None, 2, 3).to_args();
        assert!(!args.contains(&"--guild".to_string()));
        assert_eq!(args[0], "--channel");
    }

    #[test]
    fn test_options_survive_the_wire() {
        let ctx = InvocationContext::new(Some(1), 2, 3)
            .with_option("user", 42u64)
            .with_option("count", 3)
            .with_option("ratio", 0.5)
            .with_option("loud", true)
            .with_option("text", "hello there");

        let args = ctx.to_args();
        let separator = args.iter().position(|a| a == "--").expect("separator");
        let parsed: Map<String, Value> = serde_json::from_str(&args[separator + 1]).unwrap();

        assert_eq!(parsed, ctx.options);
        assert_eq!(parsed["user"], json!(42));
    }
}
