use crate::command::{self, Command, HELP};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use veil_core::{SecureStore, VeilError};
use veil_domain::NIL;
use veil_store::StoreTransport;

const PROMPT: &str = "$ ";
const OK: &str = "OK";
const EMPTY: &str = "(empty list)";

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Print(String),
    Exit,
}

/// Reads commands from stdin until `exit` or end of input.
pub(crate) async fn run<T: StoreTransport>(store: &SecureStore<T>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            return Ok(());
        };
        match handle_line(store, &line).await {
            Outcome::Print(text) if text.is_empty() => {},
            Outcome::Print(text) => writeln!(out, "{text}")?,
            Outcome::Exit => return Ok(()),
        }
    }
}

pub(crate) async fn handle_line<T: StoreTransport>(store: &SecureStore<T>, line: &str) -> Outcome {
    match command::parse(line) {
        Ok(None) => Outcome::Print(String::new()),
        Ok(Some(Command::Exit)) => Outcome::Exit,
        Ok(Some(command)) => match execute(store, command).await {
            Ok(text) => Outcome::Print(text),
            Err(err) => Outcome::Print(format!("(error) {err}")),
        },
        Err(command::ParseError(message)) => Outcome::Print(format!("(error) {message}")),
    }
}

async fn execute<T: StoreTransport>(
    store: &SecureStore<T>,
    command: Command,
) -> Result<String, VeilError> {
    Ok(match command {
        Command::Set { key, value, expiry } => {
            store.set(&key, &value, expiry).await?;
            OK.to_owned()
        },
        Command::Get { key } => store.get(&key).await?.unwrap_or_else(|| NIL.to_owned()),
        Command::Del { key } => store.del(&key).await?.to_string(),
        Command::Zadd { key, score, member } => store.zadd(&key, &score, &member).await?.to_string(),
        Command::Zrange { key, min, max } => {
            let entries = store.zrange_by_score(&key, &min, &max).await?;
            numbered(entries.iter().map(ToString::to_string))
        },
        Command::Sadd { key, members } => store.sadd(&key, &members).await?.to_string(),
        Command::Smembers { key, search } => {
            numbered(store.smembers(&key, search.as_deref()).await?.into_iter())
        },
        Command::Sum { key, operand } => {
            store.sum(&key, &operand).await?;
            OK.to_owned()
        },
        Command::Diff { key, operand } => {
            store.diff(&key, &operand).await?;
            OK.to_owned()
        },
        Command::Mult { key, operand } => {
            store.mult(&key, &operand).await?;
            OK.to_owned()
        },
        Command::FlushAll => {
            store.flush_all().await?;
            OK.to_owned()
        },
        Command::Help => HELP.to_owned(),
        Command::Exit => String::new(),
    })
}

fn numbered(items: impl Iterator<Item = String>) -> String {
    let lines: Vec<String> =
        items.enumerate().map(|(i, item)| format!("{}) {item}", i + 1)).collect();
    if lines.is_empty() { EMPTY.to_owned() } else { lines.join("\n") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::KeyRing;
    use veil_domain::{SchemeConfig, ValueScheme};
    use veil_store::MemoryStore;

    fn store() -> SecureStore<MemoryStore> {
        let keys = KeyRing::builder().secret("shell master", "shell salt").build().unwrap();
        let scheme = SchemeConfig { values: ValueScheme::Envelope, ..SchemeConfig::default() };
        SecureStore::new(MemoryStore::new(), keys, scheme).unwrap()
    }

    async fn print(store: &SecureStore<MemoryStore>, line: &str) -> String {
        match handle_line(store, line).await {
            Outcome::Print(text) => text,
            Outcome::Exit => panic!("unexpected exit"),
        }
    }

    #[tokio::test]
    async fn test_session() {
        let store = store();
        assert_eq!(print(&store, "get user:1").await, "(nil)");
        assert_eq!(print(&store, "set user:1 42").await, "OK");
        assert_eq!(print(&store, "sum user:1 8").await, "OK");
        assert_eq!(print(&store, "get user:1").await, "50");
        assert_eq!(print(&store, "del user:1").await, "OK");
        assert_eq!(print(&store, "del user:1").await, "NOK");
    }

    #[tokio::test]
    async fn test_sets_and_ranges() {
        let store = store();
        print(&store, "zadd scores 20 bob").await;
        print(&store, "zadd scores 10 alice").await;
        assert_eq!(print(&store, "zrange scores -inf inf").await, "1) alice 10\n2) bob 20");
        assert_eq!(print(&store, "zrange scores 30 +inf").await, "(empty list)");

        assert_eq!(print(&store, r#"sadd tags "hello world" goodbye"#).await, "OK");
        assert_eq!(print(&store, "smembers tags world").await, "1) hello world");
    }

    #[tokio::test]
    async fn test_errors_are_prefixed() {
        let store = store();
        assert!(print(&store, "zadd z ten m").await.starts_with("(error) Invalid input"));
        assert_eq!(print(&store, "get").await, "(error) usage: get key");
        assert!(print(&store, "sum missing 1").await.starts_with("(error) Not found"));
        assert_eq!(handle_line(&store, "exit").await, Outcome::Exit);
        assert_eq!(print(&store, "").await, "");
    }
}
