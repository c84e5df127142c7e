//! Interactive paging over one resource.
//!
//! Reads one command per line and keeps a single cache alive across page
//! and search changes, so moving within the prefetch window is free.

use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::api::Record;
use crate::cache::{MutationAction, Resolved, ResourceApi};
use crate::list::ListQuery;
use crate::notify::Notification;
use crate::table;

pub const HELP: &str = "\
commands:
  n           next page
  p           previous page
  g <page>    go to page
  /<search>   filter (empty clears), back to page 1
  r           refetch the current page
  d <id>      delete an entity
  ?           this help
  q           quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
  Next,
  Prev,
  Goto(u32),
  Search(String),
  Refetch,
  Delete(String),
  Help,
  Quit,
}

impl FromStr for BrowseCommand {
  type Err = String;

  fn from_str(line: &str) -> Result<Self, Self::Err> {
    let line = line.trim();
    if let Some(search) = line.strip_prefix('/') {
      return Ok(BrowseCommand::Search(search.trim().to_string()));
    }

    let (cmd, arg) = match line.split_once(char::is_whitespace) {
      Some((cmd, arg)) => (cmd, arg.trim()),
      None => (line, ""),
    };
    match (cmd, arg) {
      ("n", "") => Ok(BrowseCommand::Next),
      ("p", "") => Ok(BrowseCommand::Prev),
      ("r", "") => Ok(BrowseCommand::Refetch),
      ("?", "") | ("h", "") => Ok(BrowseCommand::Help),
      ("q", "") => Ok(BrowseCommand::Quit),
      ("g", page) => page
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .map(BrowseCommand::Goto)
        .ok_or_else(|| format!("not a page number: '{}'", page)),
      ("d", "") => Err("usage: d <id>".to_string()),
      ("d", id) => Ok(BrowseCommand::Delete(id.to_string())),
      _ => Err(format!("unknown command '{}', ? for help", line)),
    }
  }
}

/// One-line summary under the table.
pub fn status_line(resolved: &Resolved<Record>, page: u32, page_count: Option<u32>) -> String {
  let mut status = match (page_count, resolved.total) {
    (Some(count), Some(total)) => format!("page {} of {}, {} total", page, count, total),
    _ => format!("page {}", page),
  };
  if resolved.is_loading {
    status.push_str(", loading");
  }
  if let Some(error) = &resolved.error {
    status.push_str(&format!(", error: {}", error));
  }
  status
}

pub struct Browser<A> {
  query: ListQuery<A, Record>,
}

impl<A: ResourceApi<Record>> Browser<A> {
  pub fn new(query: ListQuery<A, Record>) -> Self {
    Self { query }
  }

  pub fn query(&self) -> &ListQuery<A, Record> {
    &self.query
  }

  /// Run until `q` or end of input.
  pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
  where
    R: AsyncBufRead + Unpin,
    W: Write,
  {
    let mut lines = input.lines();
    self.render(out).await?;

    loop {
      write!(out, "{}> ", self.query.cache().resource())?;
      out.flush()?;

      let Some(line) = lines.next_line().await? else {
        break;
      };
      if line.trim().is_empty() {
        continue;
      }

      let command = match line.parse::<BrowseCommand>() {
        Ok(command) => command,
        Err(message) => {
          writeln!(out, "{}", Notification::error(message))?;
          continue;
        }
      };
      debug!(?command, "browse command");

      if !self.apply(command, out).await? {
        break;
      }
    }
    Ok(())
  }

  /// Returns false when browsing should stop.
  async fn apply<W: Write>(&mut self, command: BrowseCommand, out: &mut W) -> Result<bool> {
    match command {
      BrowseCommand::Quit => return Ok(false),
      BrowseCommand::Help => {
        writeln!(out, "{}", HELP)?;
        return Ok(true);
      }
      BrowseCommand::Next => {
        if !self.query.next_page() {
          writeln!(out, "{}", Notification::info("already on the last page"))?;
          return Ok(true);
        }
      }
      BrowseCommand::Prev => {
        if !self.query.prev_page() {
          writeln!(out, "{}", Notification::info("already on the first page"))?;
          return Ok(true);
        }
      }
      BrowseCommand::Goto(page) => self.query.set_page(page),
      BrowseCommand::Search(search) => {
        self.query.set_search(search);
      }
      BrowseCommand::Refetch => {
        self.query.refetch().await;
      }
      BrowseCommand::Delete(id) => {
        let resource = self.query.cache().resource().to_string();
        let result = self.query.cache().delete(&id).await;
        writeln!(
          out,
          "{}",
          Notification::for_mutation(MutationAction::Delete, &resource, &result)
        )?;
      }
    }
    self.render(out).await?;
    Ok(true)
  }

  async fn render<W: Write>(&mut self, out: &mut W) -> Result<()> {
    let page = self.query.options().page;
    let resolved = self.query.settle().await.clone();
    if resolved.data.is_none() && resolved.error.is_none() {
      return Err(eyre!("page {} settled without data", page));
    }
    write!(out, "{}", table::render(resolved.rows()))?;
    writeln!(out, "{}", status_line(&resolved, page, self.query.page_count()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSettings, PagedResourceCache};
  use crate::list::ListOptions;
  use crate::test_support::MockApi;
  use std::sync::Arc;

  fn browser(api: &MockApi) -> Browser<MockApi> {
    let cache = PagedResourceCache::new(Arc::new(api.clone()), "skills", CacheSettings::default());
    Browser::new(ListQuery::new(Arc::new(cache), ListOptions::default()))
  }

  async fn run(browser: &mut Browser<MockApi>, input: &str) -> String {
    let mut out = Vec::new();
    browser.run(input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
  }

  #[test]
  fn test_parse_commands() {
    assert_eq!("n".parse(), Ok(BrowseCommand::Next));
    assert_eq!(" g 4 ".parse(), Ok(BrowseCommand::Goto(4)));
    assert_eq!("/rust lang".parse(), Ok(BrowseCommand::Search("rust lang".to_string())));
    assert_eq!("/".parse(), Ok(BrowseCommand::Search(String::new())));
    assert_eq!("d 12".parse(), Ok(BrowseCommand::Delete("12".to_string())));
    assert!("g 0".parse::<BrowseCommand>().is_err());
    assert!("d".parse::<BrowseCommand>().is_err());
    assert!("x".parse::<BrowseCommand>().is_err());
  }

  #[tokio::test]
  async fn test_paging_inside_window_does_not_refetch() {
    let api = MockApi::new().with_rows("skills", 45);
    let mut browser = browser(&api);

    let out = run(&mut browser, "n\nn\np\nq\n").await;
    assert!(out.contains("page 1 of 5, 45 total"));
    assert!(out.contains("page 3 of 5, 45 total"));
    assert_eq!(api.page_calls(), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_search_resets_to_first_page() {
    let api = MockApi::new().with_rows("skills", 45);
    let mut browser = browser(&api);

    let out = run(&mut browser, "g 2\n/skills 4\n").await;
    assert_eq!(browser.query().options().page, 1);
    assert!(out.contains("page 1 of 1, 7 total"));
  }

  #[tokio::test]
  async fn test_delete_prints_notification() {
    let api = MockApi::new().with_rows("skills", 12);
    let mut browser = browser(&api);

    let out = run(&mut browser, "d 3\nd 99\nwat\n").await;
    assert!(out.contains("[success] skills deleted"));
    assert!(out.contains("[error] failed to delete skills"));
    assert!(out.contains("[error] unknown command 'wat'"));
    assert!(out.contains("page 1 of 2, 11 total"));
    assert_eq!(api.row_count("skills"), 11);
  }
}
