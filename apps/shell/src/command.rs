//! Shell command parsing.

use veil_store::Expiry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Set { key: String, value: String, expiry: Option<Expiry> },
    Get { key: String },
    Del { key: String },
    Zadd { key: String, score: String, member: String },
    Zrange { key: String, min: String, max: String },
    Sadd { key: String, members: Vec<String> },
    Smembers { key: String, search: Option<String> },
    Sum { key: String, operand: String },
    Diff { key: String, operand: String },
    Mult { key: String, operand: String },
    FlushAll,
    Help,
    Exit,
}

pub(crate) const HELP: &str = "\
set key value [ex seconds|px millis]
get key
del key
zadd key score member
zrange key min max
sadd key member [member ...]
smembers key [search ...]
sum|diff|mult key number
flushall
help
exit";

/// Why a line could not be parsed; the message is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError(pub(crate) String);

impl ParseError {
    fn usage(usage: &str) -> Self {
        Self(format!("usage: {usage}"))
    }
}

/// Parses one input line. `Ok(None)` for a blank line.
pub(crate) fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let arg = |i: usize| args[i].clone();

    let command = match (name.to_ascii_lowercase().as_str(), args.len()) {
        ("set", 2) => Command::Set { key: arg(0), value: arg(1), expiry: None },
        ("set", 4) => Command::Set { key: arg(0), value: arg(1), expiry: Some(expiry(&args[2], &args[3])?) },
        ("set", _) => return Err(ParseError::usage("set key value [ex seconds|px millis]")),
        ("get", 1) => Command::Get { key: arg(0) },
        ("get", _) => return Err(ParseError::usage("get key")),
        ("del", 1) => Command::Del { key: arg(0) },
        ("del", _) => return Err(ParseError::usage("del key")),
        ("zadd", 3) => Command::Zadd { key: arg(0), score: arg(1), member: arg(2) },
        ("zadd", _) => return Err(ParseError::usage("zadd key score member")),
        ("zrange" | "zrangebyscore", 3) => Command::Zrange { key: arg(0), min: arg(1), max: arg(2) },
        ("zrange" | "zrangebyscore", _) => return Err(ParseError::usage("zrange key min max")),
        ("sadd", n) if n >= 2 => Command::Sadd { key: arg(0), members: args[1..].to_vec() },
        ("sadd", _) => return Err(ParseError::usage("sadd key member [member ...]")),
        ("smembers", 0) => return Err(ParseError::usage("smembers key [search ...]")),
        ("smembers", 1) => Command::Smembers { key: arg(0), search: None },
        ("smembers", _) => Command::Smembers { key: arg(0), search: Some(args[1..].join(" ")) },
        ("sum", 2) => Command::Sum { key: arg(0), operand: arg(1) },
        ("diff", 2) => Command::Diff { key: arg(0), operand: arg(1) },
        ("mult", 2) => Command::Mult { key: arg(0), operand: arg(1) },
        (op @ ("sum" | "diff" | "mult"), _) => return Err(ParseError::usage(&format!("{op} key number"))),
        ("flushall", 0) => Command::FlushAll,
        ("flushall", _) => return Err(ParseError::usage("flushall")),
        ("help", _) => Command::Help,
        ("exit" | "quit", _) => Command::Exit,
        (other, _) => return Err(ParseError(format!("unknown command `{other}`, try `help`"))),
    };
    Ok(Some(command))
}

fn expiry(unit: &str, amount: &str) -> Result<Expiry, ParseError> {
    let amount: u64 =
        amount.parse().map_err(|_| ParseError(format!("expiry `{amount}` is not a positive integer")))?;
    match unit.to_ascii_lowercase().as_str() {
        "ex" => Ok(Expiry::Seconds(amount)),
        "px" => Ok(Expiry::Millis(amount)),
        _ => Err(ParseError::usage("set key value [ex seconds|px millis]")),
    }
}

/// Splits on whitespace; double quotes group words and `\"` escapes a quote.
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => current.extend(chars.next()),
            '"' => {
                quoted = !quoted;
                in_token = true;
            },
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            },
            c => {
                current.push(c);
                in_token = true;
            },
        }
    }
    if quoted {
        return Err(ParseError("unterminated quote".to_owned()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
