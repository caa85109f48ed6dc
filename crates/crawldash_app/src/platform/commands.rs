//! Line commands typed at the dashboard prompt.

use crawldash_core::{JobId, JobStatus, Msg, SortField, SortOrder};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  page N | next | prev              move through the job list
  filter STATUS | filter all        filter by queued, running, done, error, ...
  search TEXT | search              search urls (no text clears)
  sort url|status|created [asc|desc]
  add URL                           submit a url for crawling
  start ID | stop ID                control a crawl
  delete ID | reanalyze ID
  select ID | clear                 toggle or clear the bulk selection
  delete-selected | reanalyze-selected
  open ID | close                   show or hide a job's analysis
  refresh                           reload everything on screen
  dismiss N                         dismiss notification N
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(Vec<Msg>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, type help")]
    Unknown(String),
    #[error("{0} needs {1}")]
    MissingArgument(&'static str, &'static str),
    #[error("{0:?} is not a number")]
    BadNumber(String),
    #[error("cannot sort by {0:?}")]
    BadSort(String),
}

pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let msgs = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Some(Command::Help)),
        "quit" | "exit" | "q" => return Ok(Some(Command::Quit)),
        "page" => {
            let page = number(rest, "page", "a page number")?;
            vec![Msg::PageRequested(u32::try_from(page).unwrap_or(u32::MAX))]
        }
        "next" => vec![Msg::NextPage],
        "prev" => vec![Msg::PrevPage],
        "filter" => match rest {
            "" => return Err(ParseError::MissingArgument("filter", "a status or all")),
            "all" => vec![Msg::FilterChanged(None)],
            status => vec![Msg::FilterChanged(Some(JobStatus::parse(status)))],
        },
        "search" => vec![Msg::SearchChanged(rest.to_string())],
        "sort" => vec![parse_sort(rest)?],
        "add" => {
            // An empty argument still submits; the form reports the field error.
            vec![Msg::UrlInputChanged(rest.to_string()), Msg::UrlSubmitted]
        }
        "start" => vec![Msg::StartClicked(id(rest, "start")?)],
        "stop" => vec![Msg::StopClicked(id(rest, "stop")?)],
        "delete" => vec![Msg::DeleteClicked(id(rest, "delete")?)],
        "reanalyze" => vec![Msg::ReanalyzeClicked(id(rest, "reanalyze")?)],
        "select" => vec![Msg::SelectionToggled(id(rest, "select")?)],
        "clear" => vec![Msg::SelectionCleared],
        "delete-selected" => vec![Msg::DeleteSelectedClicked],
        "reanalyze-selected" => vec![Msg::ReanalyzeSelectedClicked],
        "open" => vec![Msg::DetailOpened(id(rest, "open")?)],
        "close" => vec![Msg::DetailClosed],
        "refresh" => vec![Msg::RefreshClicked],
        "dismiss" => vec![Msg::NotificationDismissed(number(
            rest,
            "dismiss",
            "a notification number",
        )?)],
        _ => return Err(ParseError::Unknown(word.to_string())),
    };
    Ok(Some(Command::Dispatch(msgs)))
}

fn id(arg: &str, command: &'static str) -> Result<JobId, ParseError> {
    number(arg, command, "a job id")
}

fn number(arg: &str, command: &'static str, what: &'static str) -> Result<u64, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument(command, what));
    }
    arg.parse()
        .map_err(|_| ParseError::BadNumber(arg.to_string()))
}

fn parse_sort(arg: &str) -> Result<Msg, ParseError> {
    let mut parts = arg.split_whitespace();
    let sort_by = match parts.next() {
        Some("url") => SortField::Url,
        Some("status") => SortField::Status,
        Some("created") | Some("created_at") => SortField::CreatedAt,
        Some(other) => return Err(ParseError::BadSort(other.to_string())),
        None => return Err(ParseError::MissingArgument("sort", "a field")),
    };
    let sort_order = match parts.next() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => return Err(ParseError::BadSort(other.to_string())),
    };
    Ok(Msg::SortChanged {
        sort_by,
        sort_order,
    })
}
