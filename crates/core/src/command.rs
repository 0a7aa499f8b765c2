//! Normalized commands produced by the classifier and consumed by the dispatcher.

use std::fmt;

/// The fixed vocabulary of actions the assistant understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Open,
    Close,
    Play,
    Content,
    GoogleSearch,
    YoutubeSearch,
    System,
    General,
    Realtime,
    Exit,
    /// Synthetic verb carrying a classification failure. Never produced by parsing.
    Error,
}

impl Verb {
    /// Verbs recognized in a decision-model reply, in matching order.
    pub const RECOGNIZED: [Verb; 10] = [
        Verb::Exit,
        Verb::General,
        Verb::Realtime,
        Verb::Open,
        Verb::Close,
        Verb::Play,
        Verb::System,
        Verb::Content,
        Verb::GoogleSearch,
        Verb::YoutubeSearch,
    ];

    /// The keyword that introduces this verb in normalized command text.
    pub fn keyword(self) -> &'static str {
        match self {
            Verb::Open => "open",
            Verb::Close => "close",
            Verb::Play => "play",
            Verb::Content => "content",
            Verb::GoogleSearch => "google search",
            Verb::YoutubeSearch => "youtube search",
            Verb::System => "system",
            Verb::General => "general",
            Verb::Realtime => "realtime",
            Verb::Exit => "exit",
            Verb::Error => "error",
        }
    }

    /// Whether the verb is answered by the language-model chain rather than an action.
    pub fn is_conversational(self) -> bool {
        matches!(self, Verb::General | Verb::Realtime)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single normalized instruction: a verb plus its free-text argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub argument: String,
}

/// Commands in classification order. Each one executes independently of the others.
pub type CommandBatch = Vec<Command>;

impl Command {
    pub fn new(verb: Verb, argument: impl Into<String>) -> Self {
        Self {
            verb,
            argument: argument.into(),
        }
    }

    /// A conversational command answered by the language-model chain.
    pub fn general(text: impl Into<String>) -> Self {
        Self::new(Verb::General, text)
    }

    /// A synthetic command reporting that classification itself failed.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Verb::Error, message)
    }

    /// Parses one normalized fragment such as `"youtube search cats"`.
    ///
    /// The verb keyword must be followed by whitespace or the end of the
    /// fragment, so `"opening hours"` is not mistaken for an `open` command.
    /// Returns `None` when the fragment starts with no recognized verb.
    pub fn parse(fragment: &str) -> Option<Self> {
        let fragment = fragment.trim();
        Verb::RECOGNIZED.into_iter().find_map(|verb| {
            let rest = strip_keyword(fragment, verb.keyword())?;
            Some(Self::new(verb, rest.trim()))
        })
    }

    /// True when the argument still holds the grammar's literal `(query)` placeholder.
    pub fn has_placeholder(&self) -> bool {
        self.argument.contains("(query)")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.verb, self.argument.is_empty()) {
            (Verb::Error, _) => write!(f, "error: {}", self.argument),
            (verb, true) => write!(f, "{}", verb),
            (verb, false) => write!(f, "{} {}", verb, self.argument),
        }
    }
}

fn strip_keyword<'a>(fragment: &'a str, keyword: &str) -> Option<&'a str> {
    let head = fragment.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &fragment[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}
