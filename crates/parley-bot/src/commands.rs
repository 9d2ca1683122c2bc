//! Slash-command grammar.
//!
//! A chat message is a command when its first whitespace-delimited token is
//! one of the known `/name` forms, optionally addressed as `/name@botname`.
//! Arguments are split on single spaces, so the question keeps whatever
//! spacing the user typed after the last argument. Anything else, including
//! unknown slash commands, is ordinary chat text.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Date format accepted by `/ask_datetime_context`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// A usage problem, phrased as the reply the user should see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Please use format: /ask_days_context <days> <question>")]
    DaysUsage,
    #[error("Please provide valid number of days")]
    InvalidDays,
    #[error("Number of days should be positive")]
    NonPositiveDays,
    #[error("Please use format: /ask_today <question>")]
    TodayUsage,
    #[error("Please use format: /ask_no_context <question>")]
    NoContextUsage,
    #[error("Please use format: /ask_datetime_context <DD-MM-YYYY> <question>")]
    DatetimeUsage,
    #[error("Please provide valid date in format DD-MM-YYYY")]
    InvalidDate,
    #[error("Please provide a question after /ask")]
    AskUsage,
    #[error("Cannot process empty or non-text message")]
    EmptyReply,
}

/// A recognized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/ask [question]`: no history. When sent as a reply, the replied-to
    /// text is the question and any inline text is ignored.
    Ask { question: Option<String> },
    /// `/ask_no_context <question>`: no history.
    AskNoContext { question: String },
    /// `/ask_today <question>`: history from the last 24 hours.
    AskToday { question: String },
    /// `/ask_days_context <days> <question>`: history from the last `days` days.
    AskDaysContext { days: i64, question: String },
    /// `/ask_datetime_context <DD-MM-YYYY> <question>`: history since local
    /// midnight of `date`.
    AskDatetimeContext { date: NaiveDate, question: String },
    /// `/spent`: the chat's all-time spend.
    Spent,
}

impl Command {
    /// Parse a chat message. `None` means the text is not a command.
    pub fn parse(text: &str) -> Option<Result<Command, CommandError>> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _bot)| name);

        let parsed = match name {
            "ask" => Ok(parse_ask(text)),
            "ask_no_context" => single_arg(text, CommandError::NoContextUsage)
                .map(|question| Command::AskNoContext { question }),
            "ask_today" => single_arg(text, CommandError::TodayUsage)
                .map(|question| Command::AskToday { question }),
            "ask_days_context" => parse_days(text),
            "ask_datetime_context" => parse_datetime(text),
            "spent" => Ok(Command::Spent),
            _ => return None,
        };
        Some(parsed)
    }

    /// The question to answer, given the text of the message this command
    /// replied to (if any). `None` for `/spent`.
    pub fn question(&self, reply_to_text: Option<&str>) -> Result<Option<String>, CommandError> {
        let question = match self {
            Command::Ask { question } => match reply_to_text {
                Some(replied) if replied.trim().is_empty() => return Err(CommandError::EmptyReply),
                Some(replied) => replied.to_string(),
                None => question.clone().ok_or(CommandError::AskUsage)?,
            },
            Command::AskNoContext { question }
            | Command::AskToday { question }
            | Command::AskDaysContext { question, .. }
            | Command::AskDatetimeContext { question, .. } => question.clone(),
            Command::Spent => return Ok(None),
        };
        Ok(Some(question))
    }

    /// Start of the history this command asks about, evaluated at `now`.
    /// `None` for `/spent`.
    pub fn context_start(&self, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let start = match self {
            Command::Ask { .. } | Command::AskNoContext { .. } => now,
            Command::AskToday { .. } => now - Duration::days(1),
            Command::AskDaysContext { days, .. } => Duration::try_days(*days)
                .and_then(|span| now.checked_sub_signed(span))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            Command::AskDatetimeContext { date, .. } => local_midnight(*date, offset),
            Command::Spent => return None,
        };
        Some(start)
    }
}

/// Midnight at the start of `date` in `offset`, as a UTC instant.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

// ── Argument parsing ───────────────────────────────────────────────

fn parse_ask(text: &str) -> Command {
    let question = match text.splitn(2, ' ').collect::<Vec<_>>().as_slice() {
        [_, question] if !question.trim().is_empty() => Some((*question).to_string()),
        _ => None,
    };
    Command::Ask { question }
}

fn single_arg(text: &str, usage: CommandError) -> Result<String, CommandError> {
    match text.splitn(2, ' ').collect::<Vec<_>>().as_slice() {
        [_, question] if !question.trim().is_empty() => Ok((*question).to_string()),
        _ => Err(usage),
    }
}

fn parse_days(text: &str) -> Result<Command, CommandError> {
    let &[_, days, question] = text.splitn(3, ' ').collect::<Vec<_>>().as_slice() else {
        return Err(CommandError::DaysUsage);
    };
    if question.trim().is_empty() {
        return Err(CommandError::DaysUsage);
    }
    let days: i64 = days.parse().map_err(|_| CommandError::InvalidDays)?;
    if days <= 0 {
        return Err(CommandError::NonPositiveDays);
    }
    Ok(Command::AskDaysContext {
        days,
        question: question.to_string(),
    })
}

fn parse_datetime(text: &str) -> Result<Command, CommandError> {
    let &[_, date, question] = text.splitn(3, ' ').collect::<Vec<_>>().as_slice() else {
        return Err(CommandError::DatetimeUsage);
    };
    if question.trim().is_empty() {
        return Err(CommandError::DatetimeUsage);
    }
    let date =
        NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| CommandError::InvalidDate)?;
    Ok(Command::AskDatetimeContext {
        date,
        question: question.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 30, 0).unwrap()
    }

    fn parse_ok(text: &str) -> Command {
        Command::parse(text).unwrap().unwrap()
    }

    fn parse_err(text: &str) -> CommandError {
        Command::parse(text).unwrap().unwrap_err()
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert!(Command::parse("hello there").is_none());
        assert!(Command::parse("").is_none());
        assert!(Command::parse("   ").is_none());
        assert!(Command::parse("/start").is_none());
        assert!(Command::parse("/asking something").is_none());
        assert!(Command::parse("see /ask").is_none());
    }

    #[test]
    fn ask_variants() {
        assert_eq!(
            parse_ok("/ask what is up?"),
            Command::Ask {
                question: Some("what is up?".into())
            }
        );
        assert_eq!(parse_ok("/ask"), Command::Ask { question: None });
        assert_eq!(
            parse_ok("/ask_no_context hi"),
            Command::AskNoContext {
                question: "hi".into()
            }
        );
        assert_eq!(
            parse_ok("/ask_today what happened?"),
            Command::AskToday {
                question: "what happened?".into()
            }
        );
        assert_eq!(parse_ok("/spent"), Command::Spent);
        assert_eq!(parse_ok("/spent extra words"), Command::Spent);
    }

    #[test]
    fn bot_suffix_is_accepted() {
        assert_eq!(
            parse_ok("/ask_today@parley_bot summary please"),
            Command::AskToday {
                question: "summary please".into()
            }
        );
        assert_eq!(parse_ok("/spent@parley_bot"), Command::Spent);
    }

    #[test]
    fn days_context() {
        assert_eq!(
            parse_ok("/ask_days_context 3 what did we plan?"),
            Command::AskDaysContext {
                days: 3,
                question: "what did we plan?".into()
            }
        );
        assert_eq!(parse_err("/ask_days_context 3"), CommandError::DaysUsage);
        assert_eq!(
            parse_err("/ask_days_context three q"),
            CommandError::InvalidDays
        );
        assert_eq!(
            parse_err("/ask_days_context 0 q"),
            CommandError::NonPositiveDays
        );
        assert_eq!(
            parse_err("/ask_days_context -2 q"),
            CommandError::NonPositiveDays
        );
    }

    #[test]
    fn datetime_context() {
        assert_eq!(
            parse_ok("/ask_datetime_context 01-05-2024 recap"),
            Command::AskDatetimeContext {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                question: "recap".into()
            }
        );
        assert_eq!(
            parse_err("/ask_datetime_context 2024-05-01 recap"),
            CommandError::InvalidDate
        );
        assert_eq!(
            parse_err("/ask_datetime_context 31-02-2024 recap"),
            CommandError::InvalidDate
        );
        assert_eq!(
            parse_err("/ask_datetime_context 01-05-2024"),
            CommandError::DatetimeUsage
        );
    }

    #[test]
    fn missing_questions_give_usage() {
        assert_eq!(parse_err("/ask_today"), CommandError::TodayUsage);
        assert_eq!(parse_err("/ask_no_context "), CommandError::NoContextUsage);
        assert_eq!(
            CommandError::TodayUsage.to_string(),
            "Please use format: /ask_today <question>"
        );
    }

    #[test]
    fn question_spacing_is_preserved() {
        assert_eq!(
            parse_ok("/ask_today a  b"),
            Command::AskToday {
                question: "a  b".into()
            }
        );
    }

    #[test]
    fn ask_question_prefers_replied_text() {
        let inline = parse_ok("/ask inline");
        assert_eq!(inline.question(None).unwrap().as_deref(), Some("inline"));
        assert_eq!(
            inline.question(Some("replied")).unwrap().as_deref(),
            Some("replied")
        );

        let bare = parse_ok("/ask");
        assert_eq!(bare.question(None).unwrap_err(), CommandError::AskUsage);
        assert_eq!(
            bare.question(Some("  ")).unwrap_err(),
            CommandError::EmptyReply
        );
        assert_eq!(Command::Spent.question(None).unwrap(), None);
    }

    #[test]
    fn context_starts() {
        let now = now();
        assert_eq!(parse_ok("/ask q").context_start(now, utc()), Some(now));
        assert_eq!(
            parse_ok("/ask_no_context q").context_start(now, utc()),
            Some(now)
        );
        assert_eq!(
            parse_ok("/ask_today q").context_start(now, utc()),
            Some(now - Duration::days(1))
        );
        assert_eq!(
            parse_ok("/ask_days_context 7 q").context_start(now, utc()),
            Some(now - Duration::days(7))
        );
        assert_eq!(Command::Spent.context_start(now, utc()), None);
    }

    #[test]
    fn huge_day_count_clamps_to_the_beginning_of_time() {
        let cmd = parse_ok("/ask_days_context 9000000000000 q");
        assert_eq!(
            cmd.context_start(now(), utc()),
            Some(DateTime::<Utc>::MIN_UTC)
        );
    }

    #[test]
    fn datetime_start_is_local_midnight() {
        let cmd = parse_ok("/ask_datetime_context 01-05-2024 q");
        assert_eq!(
            cmd.context_start(now(), utc()),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );

        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(
            cmd.context_start(now(), plus3),
            Some(Utc.with_ymd_and_hms(2024, 4, 30, 21, 0, 0).unwrap())
        );
    }
}
